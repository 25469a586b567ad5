//! # Protocols
//!
//! Each lending protocol implements `Protocol` and adds its own tools to the
//! shared `ToolRegistry`. Protocols are checked in registration order and only
//! those with a deployment on the connected chain register anything.

pub mod aave_v3;

use std::sync::Arc;

use crate::{
    blockchain::{client::RpcBackend, models::EvmError, services::transactions::TxBuilder},
    mcp::{session_store::SessionStore, tools::ToolRegistry},
};

/// What a protocol gets to build its tools from.
#[derive(Clone)]
pub struct ProtocolContext {
    pub backend: Arc<dyn RpcBackend>,
    pub sessions: SessionStore,
    pub builder: TxBuilder,
    pub chain_id: u64,
}

pub trait Protocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_chain(&self, chain_id: u64) -> bool;

    /// Adds this protocol's tools. Fails with `UnsupportedChain` when called
    /// for a chain it has no deployment on.
    fn register(&self, tools: &mut ToolRegistry, ctx: &ProtocolContext) -> Result<(), EvmError>;
}

#[derive(Default)]
pub struct ProtocolRegistry {
    protocols: Vec<Box<dyn Protocol>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every protocol shipped with the server.
    pub fn builtin() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.add(Box::new(aave_v3::AaveV3::builtin()?));
        Ok(registry)
    }

    pub fn add(&mut self, protocol: Box<dyn Protocol>) {
        self.protocols.push(protocol);
    }

    /// Registers every protocol that supports `ctx.chain_id` and returns the
    /// names of those that did.
    pub fn register_all(
        &self,
        tools: &mut ToolRegistry,
        ctx: &ProtocolContext,
    ) -> Result<Vec<&'static str>, EvmError> {
        let mut registered = Vec::new();
        for protocol in &self.protocols {
            if protocol.supports_chain(ctx.chain_id) {
                protocol.register(tools, ctx)?;
                registered.push(protocol.name());
            }
        }
        Ok(registered)
    }
}
