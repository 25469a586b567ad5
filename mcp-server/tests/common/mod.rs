//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aave_mcp_server::{
    blockchain::{
        abi::{encode_uint256, Selector},
        client::RpcBackend,
    },
    config::Config,
    mcp::{handler::handle_mcp_request, protocol::Request},
    AppState,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use serde_json::{json, Value};

pub const MAINNET_POOL: &str = "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2";
pub const MAINNET_DATA_PROVIDER: &str = "0x7B4EB56E7CD4b454BA8ff71E4518426c9B8bFe4B";
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USER: &str = "0x1111111111111111111111111111111111111111";

/// BIP32 test vector 1 key at m/0H, and the address it derives along
/// m/44'/60'/0'/0/0.
pub const SESSION_PUBKEY: &str = "035a784662a4a20a65bf6aab9ae98a6c068a81c52e4b032c0fb5400c706cfccc56";
pub const SESSION_CHAIN_CODE: &str = "47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141";
pub const SESSION_ADDRESS: &str = "0x396d861de5502accaff61079dcc11952d22ef382";

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn words(values: &[U256]) -> Bytes {
    values
        .iter()
        .flat_map(|v| encode_uint256(*v))
        .collect::<Vec<u8>>()
        .into()
}

/// Standard ABI encoding of a single `string` return value.
pub fn abi_string(s: &str) -> Bytes {
    let mut out = Vec::new();
    out.extend_from_slice(&encode_uint256(U256::from(32)));
    out.extend_from_slice(&encode_uint256(U256::from(s.len())));
    let mut data = s.as_bytes().to_vec();
    data.resize(s.len().div_ceil(32) * 32, 0);
    out.extend_from_slice(&data);
    out.into()
}

/// In-memory RPC backend. `eth_call` answers come from a table keyed by
/// contract and selector; everything else is a fixed value. Counts the gas
/// queries so tests can see which ones ran.
pub struct MockBackend {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub estimate: Option<U256>,
    pub balance: U256,
    /// Gas price queries after this many succeed fail.
    pub gas_price_ok_calls: Option<usize>,
    pub responses: Mutex<HashMap<(Address, Selector), Bytes>>,
    pub gas_price_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            chain_id: 1,
            nonce: 5,
            gas_price: U256::from(20_000_000_000u64),
            estimate: Some(U256::from(50_000)),
            balance: U256::exp10(18),
            gas_price_ok_calls: None,
            responses: Mutex::new(HashMap::new()),
            gas_price_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
        }
    }
}

impl MockBackend {
    pub fn respond(&self, to: Address, selector: Selector, data: Bytes) {
        self.responses.lock().unwrap().insert((to, selector), data);
    }

    /// Registers `decimals()` and `symbol()` for a token.
    pub fn with_token(self, token: &str, symbol: &str, decimals: u8) -> Self {
        self.respond(addr(token), [0x31, 0x3c, 0xe5, 0x67], words(&[U256::from(decimals)]));
        self.respond(addr(token), [0x95, 0xd8, 0x9b, 0x41], abi_string(symbol));
        self
    }

    pub fn estimates(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn gas_prices(&self) -> usize {
        self.gas_price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcBackend for MockBackend {
    async fn get_balance(&self, _address: Address) -> Result<U256> {
        Ok(self.balance)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let selector: Selector = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| anyhow!("calldata too short"))?;
        self.responses
            .lock()
            .unwrap()
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn get_pending_nonce(&self, _address: Address) -> Result<u64> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonce)
    }

    async fn get_gas_price(&self) -> Result<U256> {
        let n = self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        match self.gas_price_ok_calls {
            Some(limit) if n >= limit => Err(anyhow!("gas price oracle down")),
            _ => Ok(self.gas_price),
        }
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate.ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn get_chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }
}

pub fn app_state(backend: Arc<MockBackend>) -> AppState {
    let chain_id = backend.chain_id;
    AppState::new(Config::default(), backend, chain_id).unwrap()
}

/// Runs `tools/call` and returns the JSON-RPC result object.
pub async fn call_tool(state: &AppState, session: &str, name: &str, args: Value) -> Value {
    let req = Request {
        jsonrpc: "2.0".into(),
        id: json!(1),
        method: "tools/call".into(),
        params: Some(json!({ "name": name, "arguments": args })),
    };
    let resp = handle_mcp_request(req, state, session).await.unwrap();
    serde_json::to_value(resp).unwrap()
}

/// Text of a successful tool result.
pub fn ok_text(resp: &Value) -> String {
    assert_eq!(resp["result"]["isError"], false, "unexpected failure: {}", resp);
    resp["result"]["content"][0]["text"].as_str().unwrap().to_string()
}

/// Text of a tool result flagged `isError`.
pub fn err_text(resp: &Value) -> String {
    assert_eq!(resp["result"]["isError"], true, "expected failure: {}", resp);
    resp["result"]["content"][0]["text"].as_str().unwrap().to_string()
}
