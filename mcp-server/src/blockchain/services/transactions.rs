// src/blockchain/services/transactions.rs

use std::sync::Arc;

use ethers_core::types::{Address, Bytes, TransactionRequest, U256};

use crate::blockchain::{client::RpcBackend, models::EvmError};
use crate::config::Config;

/// Gas-limit policy for unsigned transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    /// Percentage added on top of `eth_estimateGas`.
    pub margin_percent: u64,
    /// Fixed gas limit for a transaction that depends on an earlier one in the
    /// same flow. Estimating it against current state would revert.
    pub dependent_gas_limit: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            margin_percent: 20,
            dependent_gas_limit: 300_000,
        }
    }
}

impl From<&Config> for GasPolicy {
    fn from(config: &Config) -> Self {
        Self {
            margin_percent: config.gas_margin_percent,
            dependent_gas_limit: config.dependent_gas_limit,
        }
    }
}

impl GasPolicy {
    /// `estimate * (100 + margin) / 100`, truncating.
    pub fn apply_margin(&self, estimate: U256) -> U256 {
        let factor = U256::from(100u64.saturating_add(self.margin_percent));
        estimate.saturating_mul(factor) / U256::from(100u64)
    }
}

/// A contract call to be wrapped into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl ContractCall {
    /// A call carrying no native value.
    pub fn new(from: Address, to: Address, data: Bytes) -> Self {
        Self {
            from,
            to,
            data,
            value: U256::zero(),
        }
    }
}

/// A fully populated legacy transaction and its unsigned serialization.
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub request: TransactionRequest,
    /// `0x`-prefixed hex of the EIP-155 signing payload.
    pub raw_hex: String,
}

/// Builds unsigned transactions against a read-only backend.
#[derive(Clone)]
pub struct TxBuilder {
    backend: Arc<dyn RpcBackend>,
    policy: GasPolicy,
}

impl TxBuilder {
    pub fn new(backend: Arc<dyn RpcBackend>, policy: GasPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn pending_nonce(&self, address: Address) -> Result<u64, EvmError> {
        self.backend
            .get_pending_nonce(address)
            .await
            .map_err(|e| EvmError::backend("get nonce", e))
    }

    /// Builds one unsigned legacy transaction.
    ///
    /// Gas price is always queried. Without an override (or with `Some(0)`)
    /// gas is estimated and the policy margin is applied; a non-zero override
    /// is used verbatim and no estimate is requested.
    pub async fn build_unsigned_tx(
        &self,
        call: &ContractCall,
        chain_id: u64,
        nonce: u64,
        gas_override: Option<u64>,
    ) -> Result<UnsignedTx, EvmError> {
        let gas_price = self
            .backend
            .get_gas_price()
            .await
            .map_err(EvmError::GasPriceUnavailable)?;

        let gas_limit = match gas_override.filter(|gas| *gas > 0) {
            Some(gas) => U256::from(gas),
            None => {
                let probe = TransactionRequest::new()
                    .from(call.from)
                    .to(call.to)
                    .data(call.data.clone())
                    .value(call.value)
                    .gas_price(gas_price);
                let estimate = self
                    .backend
                    .estimate_gas(&probe)
                    .await
                    .map_err(EvmError::GasEstimationFailed)?;
                self.policy.apply_margin(estimate)
            }
        };

        let request = TransactionRequest::new()
            .from(call.from)
            .to(call.to)
            .value(call.value)
            .data(call.data.clone())
            .nonce(nonce)
            .gas(gas_limit)
            .gas_price(gas_price)
            .chain_id(chain_id);
        let raw_hex = format!("0x{}", hex::encode(request.rlp()));

        Ok(UnsignedTx {
            nonce,
            gas_price,
            gas_limit,
            request,
            raw_hex,
        })
    }

    /// Single independent call at the sender's pending nonce.
    pub async fn build_single(
        &self,
        call: &ContractCall,
        chain_id: u64,
    ) -> Result<UnsignedTx, EvmError> {
        let nonce = self.pending_nonce(call.from).await?;
        self.build_unsigned_tx(call, chain_id, nonce, None).await
    }

    /// Approval followed by the action that consumes it.
    ///
    /// The nonce is read once. The approval at `n` is estimated normally; the
    /// action at `n + 1` gets the policy's fixed gas limit because it cannot
    /// be simulated until the approval is mined. Fails as a whole if either
    /// build fails.
    pub async fn build_approve_then(
        &self,
        approve: &ContractCall,
        action: &ContractCall,
        chain_id: u64,
    ) -> Result<(UnsignedTx, UnsignedTx), EvmError> {
        let nonce = self.pending_nonce(approve.from).await?;
        let next = nonce.checked_add(1).ok_or_else(|| {
            EvmError::backend("get nonce", anyhow::anyhow!("nonce {} overflows", nonce))
        })?;
        let first = self
            .build_unsigned_tx(approve, chain_id, nonce, None)
            .await?;
        let second = self
            .build_unsigned_tx(
                action,
                chain_id,
                next,
                Some(self.policy.dependent_gas_limit),
            )
            .await?;
        Ok((first, second))
    }
}
