// src/blockchain/models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// --- Error types ---

/// Errors raised by the contract-interaction layer.
///
/// Backend failures keep the underlying cause as `source` so it survives
/// propagation; callers only ever branch on the variant.
#[derive(Error, Debug)]
pub enum EvmError {
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("data too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unable to decode string from: 0x{0}")]
    UndecodableString(String),
    #[error("protocol has no deployment on chain {0}")]
    UnsupportedChain(u64),
    #[error("no address provided and no account info set for this session; call set_account_info first")]
    NoAddressAvailable,
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("get gas price: {0}")]
    GasPriceUnavailable(#[source] anyhow::Error),
    #[error("estimate gas: {0}")]
    GasEstimationFailed(#[source] anyhow::Error),
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl EvmError {
    pub fn backend(context: impl Into<String>, source: anyhow::Error) -> Self {
        EvmError::Backend {
            context: context.into(),
            source,
        }
    }
}

// --- Transaction result envelope ---

pub const SIGNING_MODE_ECDSA: &str = "ecdsa_secp256k1";

pub const TX_ENCODING_LEGACY_RLP: &str = "legacy_rlp";

/// Top-level JSON envelope returned by every transaction-building tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionResult {
    pub transactions: Vec<Transaction>,
}

/// One signable transaction in a (possibly multi-step) flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// 1-based execution order.
    pub sequence: u32,
    pub chain: String,
    pub chain_id: String,
    pub action: String,
    pub signing_mode: String,
    /// Hex of the unsigned serialization, without `0x`.
    pub unsigned_tx_hex: String,
    pub tx_details: BTreeMap<String, String>,
}

/// ERC-20 balance as shown to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenBalance {
    pub balance: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Canonical chain name for a chain id, `evm-<id>` when unknown.
pub fn evm_chain_name(chain_id: u64) -> String {
    let name = match chain_id {
        1 => "ethereum",
        10 => "optimism",
        56 => "bsc",
        137 => "polygon",
        324 => "zksync",
        5000 => "mantle",
        8453 => "base",
        42161 => "arbitrum",
        43114 => "avalanche",
        other => return format!("evm-{}", other),
    };
    name.to_string()
}
