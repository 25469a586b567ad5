// src/protocols/aave_v3/client.rs

use std::sync::Arc;

use ethers_core::types::Address;

use super::abi::{
    decode_reserve_config_data, decode_reserve_data, decode_user_account_data,
    encode_get_reserve_config_data, encode_get_reserve_data, encode_get_user_account_data,
    ReserveConfigData, ReserveData, UserAccountData,
};
use super::addresses::Deployment;
use crate::blockchain::{client::RpcBackend, models::EvmError, services::token};

/// Read-side access to one Aave V3 market.
#[derive(Clone)]
pub struct ProtocolClient {
    backend: Arc<dyn RpcBackend>,
    deployment: Deployment,
}

impl ProtocolClient {
    pub fn new(backend: Arc<dyn RpcBackend>, deployment: Deployment) -> Self {
        Self {
            backend,
            deployment,
        }
    }

    pub fn pool_address(&self) -> Address {
        self.deployment.pool
    }

    pub async fn get_user_account_data(&self, user: Address) -> Result<UserAccountData, EvmError> {
        let data = self
            .backend
            .call(self.deployment.pool, encode_get_user_account_data(user))
            .await
            .map_err(|e| EvmError::backend("call getUserAccountData", e))?;
        decode_user_account_data(&data)
    }

    pub async fn get_reserve_data(&self, asset: Address) -> Result<ReserveData, EvmError> {
        let data = self
            .backend
            .call(self.deployment.data_provider, encode_get_reserve_data(asset))
            .await
            .map_err(|e| EvmError::backend("call getReserveData", e))?;
        decode_reserve_data(&data)
    }

    pub async fn get_reserve_config_data(&self, asset: Address) -> Result<ReserveConfigData, EvmError> {
        let data = self
            .backend
            .call(self.deployment.data_provider, encode_get_reserve_config_data(asset))
            .await
            .map_err(|e| EvmError::backend("call getReserveConfigurationData", e))?;
        decode_reserve_config_data(&data)
    }

    pub async fn get_token_decimals(&self, token: Address) -> Result<u8, EvmError> {
        token::get_decimals(self.backend.as_ref(), token).await
    }

    pub async fn get_token_symbol(&self, token: Address) -> Result<String, EvmError> {
        token::get_symbol(self.backend.as_ref(), token).await
    }
}
