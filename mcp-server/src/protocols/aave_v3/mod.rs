//! Aave V3 lending markets.

pub mod abi;
pub mod addresses;
pub mod client;
pub mod tools;

use std::sync::Arc;

use self::addresses::DeploymentTable;
use self::client::ProtocolClient;
use self::tools::Market;
use super::{Protocol, ProtocolContext};
use crate::{blockchain::models::EvmError, mcp::tools::ToolRegistry};

pub struct AaveV3 {
    deployments: Arc<DeploymentTable>,
}

impl AaveV3 {
    pub fn new(deployments: DeploymentTable) -> Self {
        Self {
            deployments: Arc::new(deployments),
        }
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Ok(Self::new(DeploymentTable::builtin()?))
    }
}

impl Protocol for AaveV3 {
    fn name(&self) -> &'static str {
        "aave-v3"
    }

    fn supports_chain(&self, chain_id: u64) -> bool {
        self.deployments.get(chain_id).is_some()
    }

    fn register(&self, tools: &mut ToolRegistry, ctx: &ProtocolContext) -> Result<(), EvmError> {
        let deployment = self
            .deployments
            .get(ctx.chain_id)
            .ok_or(EvmError::UnsupportedChain(ctx.chain_id))?;
        let market = Market {
            client: ProtocolClient::new(ctx.backend.clone(), deployment),
            builder: ctx.builder.clone(),
            sessions: ctx.sessions.clone(),
            chain_id: ctx.chain_id,
        };
        tools::register_tools(tools, Arc::new(market));
        Ok(())
    }
}
