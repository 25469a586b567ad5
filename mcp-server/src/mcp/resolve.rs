// src/mcp/resolve.rs

use ethers_core::types::Address;

use crate::{
    blockchain::{derive::derive_evm_account, models::EvmError},
    mcp::{session_store::SessionStore, tools::ToolError},
    utils::parse_address,
};

/// Picks the account a tool acts on: the explicit address when given,
/// otherwise the address derived from the session's key material.
pub fn resolve_address(
    explicit: Option<&str>,
    session_id: &str,
    sessions: &SessionStore,
) -> Result<Address, ToolError> {
    if let Some(address) = explicit {
        return parse_address(address);
    }

    let info = sessions
        .get(session_id)
        .ok_or(EvmError::NoAddressAvailable)?;
    derive_evm_account(&info.ecdsa_public_key, &info.chain_code)
        .map(|account| account.address)
        .map_err(|e| ToolError::failed("derive ethereum address", e))
}
