// src/lib.rs

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use ethers::types::{Address, U256};

pub mod api;
pub mod blockchain;
pub mod config;
pub mod mcp;
pub mod protocols;
pub mod utils;

use blockchain::{
    client::RpcBackend,
    services::transactions::{GasPolicy, TxBuilder},
};
use mcp::{
    session_store::SessionStore,
    tools::{register_core_tools, ToolRegistry},
};
use protocols::{ProtocolContext, ProtocolRegistry};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Chain the RPC endpoint reported at startup
    pub chain_id: u64,
    pub backend: Arc<dyn RpcBackend>,
    /// Account key material per MCP session
    pub sessions: SessionStore,
    /// Every tool served by `tools/list`, fixed after startup
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    /// Registers the core tools and every built-in protocol deployed on
    /// `chain_id`.
    pub fn new(config: config::Config, backend: Arc<dyn RpcBackend>, chain_id: u64) -> Result<Self> {
        Self::with_protocols(config, backend, chain_id, &ProtocolRegistry::builtin()?)
    }

    pub fn with_protocols(
        config: config::Config,
        backend: Arc<dyn RpcBackend>,
        chain_id: u64,
        protocols: &ProtocolRegistry,
    ) -> Result<Self> {
        let sessions = SessionStore::new();
        let mut tools = ToolRegistry::new();
        register_core_tools(&mut tools, backend.clone(), sessions.clone());

        let ctx = ProtocolContext {
            backend: backend.clone(),
            sessions: sessions.clone(),
            builder: TxBuilder::new(backend.clone(), GasPolicy::from(&config)),
            chain_id,
        };
        let registered = protocols.register_all(&mut tools, &ctx)?;
        if registered.is_empty() {
            info!("no lending protocol deployed on chain {}", chain_id);
        } else {
            info!("registered protocols {:?} on chain {}", registered, chain_id);
        }

        Ok(Self {
            config,
            chain_id,
            backend,
            sessions,
            tools: Arc::new(tools),
        })
    }
}
