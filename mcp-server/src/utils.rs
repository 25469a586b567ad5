//! Utility functions for the MCP server

use ethers_core::types::Address;
use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};

use crate::mcp::tools::ToolError;

/// Helper function to extract a required argument from a JSON object
pub fn get_required_arg<T: DeserializeOwned>(args: &Value, key: &str) -> Result<T, ToolError> {
    from_value(args.get(key).cloned().unwrap_or(Value::Null)).map_err(|_| {
        ToolError::InvalidParams(format!("Missing or invalid required argument: '{}'", key))
    })
}

/// Optional string argument; absent, null and blank all read as `None`.
pub fn get_optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(_) => Err(ToolError::InvalidParams(format!(
            "Argument '{}' must be a string",
            key
        ))),
    }
}

/// Removes one leading `0x` or `0X`.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parses a 20-byte hex address, with or without prefix.
pub fn parse_address(s: &str) -> Result<Address, ToolError> {
    let raw = strip_hex_prefix(s.trim());
    let bytes = hex::decode(raw)
        .ok()
        .filter(|b| b.len() == 20)
        .ok_or_else(|| ToolError::InvalidParams(format!("Invalid address: '{}'", s)))?;
    Ok(Address::from_slice(&bytes))
}
