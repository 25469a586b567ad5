// src/mcp/session_store.rs

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session id used by the stdio transport and by HTTP callers that never
/// received an `Mcp-Session-Id`.
pub const DEFAULT_SESSION: &str = "default";

/// Key material a caller registers for its session. Handlers only ever get
/// clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub ecdsa_public_key: String,
    pub eddsa_public_key: String,
    pub chain_code: String,
}

/// Session id -> account material. Entries never expire.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    accounts: Arc<DashMap<String, AccountInfo>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `session_id`.
    pub fn set(&self, session_id: &str, info: AccountInfo) {
        self.accounts.insert(session_id.to_string(), info);
    }

    pub fn get(&self, session_id: &str) -> Option<AccountInfo> {
        self.accounts.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn delete(&self, session_id: &str) -> Option<AccountInfo> {
        self.accounts.remove(session_id).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
