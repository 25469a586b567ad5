//! # MCP Tools
//!
//! Every tool is a `ToolHandler` kept in a `ToolRegistry`. The registry keeps
//! registration order, which is also the order `tools/list` reports.
//!
//! ## Always-available tools
//! - `set_account_info` - store key material for the calling session
//! - `get_address` - derive the session's EVM address
//! - `get_eth_balance` - native balance
//! - `get_token_balance` - ERC-20 balance
//!
//! Protocol tools are added by `crate::protocols`.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::utils::to_checksum;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    blockchain::{
        client::RpcBackend,
        derive::derive_evm_account,
        models::EvmError,
        services::{balance, token},
    },
    mcp::{
        resolve::resolve_address,
        session_store::{AccountInfo, SessionStore},
    },
    utils::{get_optional_str, get_required_arg, parse_address},
};

/// Tool-level failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Reported as a JSON-RPC `-32602`.
    #[error("{0}")]
    InvalidParams(String),
    /// Reported as a tool result with `isError: true`.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// `Failed` with a short context prefix.
    pub fn failed(context: &str, err: impl std::fmt::Display) -> Self {
        ToolError::Failed(format!("{}: {}", context, err))
    }
}

impl From<EvmError> for ToolError {
    fn from(err: EvmError) -> Self {
        ToolError::Failed(err.to_string())
    }
}

/// Text returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        serde_json::to_string(value)
            .map(Self::text)
            .map_err(|e| ToolError::failed("marshal result", e))
    }
}

/// Schema entry reported by `tools/list`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError>;
}

/// Registered tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn ToolHandler>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool. A later registration under the same name replaces the
    /// earlier one in place.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        let name = tool.definition().name;
        match self.tools.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = tool,
            None => self.tools.push((name, tool)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, tool)| tool.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// JSON schema for an object of string properties.
pub fn string_schema(properties: &[(&str, &str)], required: &[&str]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({"type": "string", "description": description}),
            )
        })
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

// --- Core tools ---

pub fn register_core_tools(
    registry: &mut ToolRegistry,
    backend: Arc<dyn RpcBackend>,
    sessions: SessionStore,
) {
    registry.register(Arc::new(SetAccountInfoTool {
        sessions: sessions.clone(),
    }));
    registry.register(Arc::new(GetAddressTool {
        sessions: sessions.clone(),
    }));
    registry.register(Arc::new(GetEthBalanceTool {
        backend: backend.clone(),
        sessions: sessions.clone(),
    }));
    registry.register(Arc::new(GetTokenBalanceTool { backend, sessions }));
}

pub struct SetAccountInfoTool {
    sessions: SessionStore,
}

#[async_trait]
impl ToolHandler for SetAccountInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "set_account_info",
            "Store account key material (ECDSA public key, EdDSA public key, chain code) for the current session. Must be called before address-less balance queries or transaction builds.",
            string_schema(
                &[
                    ("ecdsa_public_key", "Hex-encoded compressed ECDSA public key (33 bytes / 66 hex chars)"),
                    ("eddsa_public_key", "Hex-encoded EdDSA public key (32 bytes / 64 hex chars)"),
                    ("chain_code", "Hex-encoded 32-byte chain code for BIP-32 derivation"),
                ],
                &["ecdsa_public_key", "eddsa_public_key", "chain_code"],
            ),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let field = |key: &str| {
            get_required_arg::<String>(args, key).map_err(|e| ToolError::Failed(e.to_string()))
        };
        let info = AccountInfo {
            ecdsa_public_key: field("ecdsa_public_key")?,
            eddsa_public_key: field("eddsa_public_key")?,
            chain_code: field("chain_code")?,
        };
        self.sessions.set(session_id, info);
        Ok(ToolOutput::text("account info stored for session"))
    }
}

/// EVM networks sharing the Ethereum derivation path.
const EVM_CHAINS: &[&str] = &[
    "Arbitrum",
    "Avalanche",
    "Base",
    "Blast",
    "BSC",
    "CronosChain",
    "Ethereum",
    "Mantle",
    "Optimism",
    "Polygon",
    "Zksync",
];

pub struct GetAddressTool {
    sessions: SessionStore,
}

#[async_trait]
impl ToolHandler for GetAddressTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_address",
            "Derive the EVM address for this session from its key material. Requires set_account_info to be called first.",
            json!({
                "type": "object",
                "properties": {
                    "chain": {
                        "type": "string",
                        "description": "EVM network name (defaults to Ethereum)",
                        "enum": EVM_CHAINS,
                    }
                },
                "required": [],
            }),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let requested = get_optional_str(args, "chain")?.unwrap_or("Ethereum");
        let chain = EVM_CHAINS
            .iter()
            .find(|c| c.eq_ignore_ascii_case(requested))
            .ok_or_else(|| ToolError::InvalidParams(format!("unsupported chain {:?}", requested)))?;

        let info = self.sessions.get(session_id).ok_or_else(|| {
            ToolError::Failed(
                "no account info set for this session; call set_account_info first".into(),
            )
        })?;
        let account = derive_evm_account(&info.ecdsa_public_key, &info.chain_code)
            .map_err(|e| ToolError::failed(&format!("failed to derive address for {}", chain), e))?;

        Ok(ToolOutput::text(format!(
            "Chain: {}\nAddress: {}\nDerived Public Key: {}\nKey Type: ECDSA",
            chain,
            to_checksum(&account.address, None),
            account.public_key_hex
        )))
    }
}

pub struct GetEthBalanceTool {
    backend: Arc<dyn RpcBackend>,
    sessions: SessionStore,
}

#[async_trait]
impl ToolHandler for GetEthBalanceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_eth_balance",
            "Query the native ETH balance of an address. If no address is provided, derives it from the session's ECDSA public key (requires set_account_info first).",
            string_schema(
                &[("address", "Ethereum address (0x-prefixed). Optional if account info is set.")],
                &[],
            ),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let address = resolve_address(get_optional_str(args, "address")?, session_id, &self.sessions)?;
        let balance = balance::get_eth_balance(self.backend.as_ref(), address)
            .await
            .map_err(|e| ToolError::failed("failed to get ETH balance", e))?;
        Ok(ToolOutput::text(format!(
            "Address: {}\nBalance: {} ETH",
            to_checksum(&address, None),
            balance
        )))
    }
}

pub struct GetTokenBalanceTool {
    backend: Arc<dyn RpcBackend>,
    sessions: SessionStore,
}

#[async_trait]
impl ToolHandler for GetTokenBalanceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_token_balance",
            "Query the ERC-20 token balance of an address. If no holder address is provided, derives it from the session's ECDSA public key (requires set_account_info first).",
            string_schema(
                &[
                    ("contract_address", "ERC-20 token contract address (0x-prefixed)"),
                    ("address", "Holder's Ethereum address (0x-prefixed). Optional if account info is set."),
                ],
                &["contract_address"],
            ),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let contract: String = get_required_arg(args, "contract_address")?;
        let token_address = parse_address(&contract)?;
        let holder = resolve_address(get_optional_str(args, "address")?, session_id, &self.sessions)?;

        let balance = token::get_token_balance(self.backend.as_ref(), token_address, holder)
            .await
            .map_err(|e| ToolError::failed("failed to get token balance", e))?;

        Ok(ToolOutput::text(format!(
            "Address: {}\nToken: {} ({})\nBalance: {}\nDecimals: {}",
            to_checksum(&holder, None),
            balance.symbol,
            to_checksum(&token_address, None),
            balance.balance,
            balance.decimals
        )))
    }
}
