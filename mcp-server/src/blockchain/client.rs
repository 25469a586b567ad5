//! Blockchain client module for EVM-compatible networks.
//!
//! `RpcBackend` is the read-only seam every other component talks to. The
//! production implementation wraps an ethers `Provider<Http>`; tests swap in
//! an in-memory backend.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers_core::types::{
    transaction::eip2718::TypedTransaction, Address, BlockNumber, Bytes, TransactionRequest, U256,
};
use ethers_providers::{Http, Middleware, Provider};

/// Read-only JSON-RPC operations needed to query contracts and build
/// unsigned transactions.
#[async_trait]
pub trait RpcBackend: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// `eth_call` against the latest block. Reverts surface as errors.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Nonce including transactions still in the mempool.
    async fn get_pending_nonce(&self, address: Address) -> Result<u64>;

    async fn get_gas_price(&self) -> Result<U256>;

    /// Estimates gas for `tx` (from, to, data, value and gas price set).
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;

    async fn get_chain_id(&self) -> Result<u64>;
}

/// Client for a single EVM JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct EvmClient {
    provider: Arc<Provider<Http>>,
}

impl EvmClient {
    /// Create a new client for the given RPC URL
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("dial ethereum rpc {}", rpc_url))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }
}

fn to_u64(value: U256, what: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(anyhow!("{} out of range: {}", what, value));
    }
    Ok(value.as_u64())
}

#[async_trait]
impl RpcBackend for EvmClient {
    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .context("eth_getBalance")
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider.call(&tx, None).await.context("eth_call")
    }

    async fn get_pending_nonce(&self, address: Address) -> Result<u64> {
        let nonce = self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .context("eth_getTransactionCount")?;
        to_u64(nonce, "nonce")
    }

    async fn get_gas_price(&self) -> Result<U256> {
        self.provider.get_gas_price().await.context("eth_gasPrice")
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        let typed: TypedTransaction = tx.clone().into();
        self.provider
            .estimate_gas(&typed, None)
            .await
            .context("eth_estimateGas")
    }

    async fn get_chain_id(&self) -> Result<u64> {
        let id = self.provider.get_chainid().await.context("eth_chainId")?;
        to_u64(id, "chain id")
    }
}
