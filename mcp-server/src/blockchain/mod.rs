// src/blockchain/mod.rs

pub mod abi;
pub mod client;
pub use client::{EvmClient, RpcBackend};

pub mod derive;
pub mod models;
pub mod services;
pub mod units;

pub use models::EvmError;
