// src/blockchain/services/balance.rs

use ethers_core::types::Address;

use crate::blockchain::{client::RpcBackend, models::EvmError, units::format_units};

pub const NATIVE_DECIMALS: u32 = 18;

/// Native balance formatted in whole ETH.
pub async fn get_eth_balance(backend: &dyn RpcBackend, address: Address) -> Result<String, EvmError> {
    let wei = backend
        .get_balance(address)
        .await
        .map_err(|e| EvmError::backend("get eth balance", e))?;
    Ok(format_units(wei, NATIVE_DECIMALS))
}
