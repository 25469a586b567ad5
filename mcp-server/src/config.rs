// src/config.rs

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";

// Loaded once at startup from the environment (and an optional .env file).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// JSON-RPC endpoint of the connected EVM network. The chain id is read
    /// from the node at startup.
    pub eth_rpc_url: String,

    // Transaction settings
    pub gas_margin_percent: u64,
    pub dependent_gas_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            eth_rpc_url: DEFAULT_RPC_URL.to_string(),
            gas_margin_percent: 20,
            dependent_gas_limit: 300_000,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let eth_rpc_url = lookup("ETH_RPC_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.eth_rpc_url);

        Ok(Config {
            port: match lookup("PORT") {
                Some(v) => v.parse().context("PORT must be a valid number")?,
                None => defaults.port,
            },
            eth_rpc_url,
            gas_margin_percent: match lookup("GAS_ESTIMATE_MARGIN_PERCENT") {
                Some(v) => v
                    .parse()
                    .context("GAS_ESTIMATE_MARGIN_PERCENT must be a valid number")?,
                None => defaults.gas_margin_percent,
            },
            dependent_gas_limit: match lookup("DEPENDENT_TX_GAS_LIMIT") {
                Some(v) => v
                    .parse()
                    .context("DEPENDENT_TX_GAS_LIMIT must be a valid number")?,
                None => defaults.dependent_gas_limit,
            },
        })
    }
}
