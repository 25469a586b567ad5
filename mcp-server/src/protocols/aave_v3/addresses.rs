// src/protocols/aave_v3/addresses.rs

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use ethers_core::types::Address;

/// Contract addresses of one Aave V3 market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub pool: Address,
    pub data_provider: Address,
}

// chain id, Pool, PoolDataProvider
const DEPLOYMENTS: &[(u64, &str, &str)] = &[
    (1, "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2", "0x7B4EB56E7CD4b454BA8ff71E4518426c9B8bFe4B"),
    (10, "0x794a61358D6845594F94dc1DB02A252b5b4814aD", "0x69FA688f1Dc47d4B5d8029D5a35FB7a548310654"),
    (56, "0x6807dc923806fE8Fd134338EABCA509979a7e0cB", "0x41585C50524fb8c3899B43D7D797d9486AAc94DB"),
    (137, "0x794a61358D6845594F94dc1DB02A252b5b4814aD", "0x69FA688f1Dc47d4B5d8029D5a35FB7a548310654"),
    (324, "0x78e30497a3c7527d953c6B1E3541b021A98Ac43c", "0x8A48E34A62fBA5E47f2C8EC51b03BB436E509E6B"),
    (5000, "0xCFbFa83332bB1A3154FA4BA4febedf5c94bDA7c0", "0xa99a1dCA4FbA6C4c277Ee756bD98A01C0E521c78"),
    (8453, "0xA238Dd80C259a72e81d7e4664a9801593F98d1c5", "0xd82a47fdebB5bf5329b09441C3DaB4b5df2153Ad"),
    (42161, "0x794a61358D6845594F94dc1DB02A252b5b4814aD", "0x69FA688f1Dc47d4B5d8029D5a35FB7a548310654"),
    (43114, "0x794a61358D6845594F94dc1DB02A252b5b4814aD", "0x69FA688f1Dc47d4B5d8029D5a35FB7a548310654"),
];

/// Per-chain deployments, fixed after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentTable {
    by_chain: BTreeMap<u64, Deployment>,
}

impl DeploymentTable {
    /// The markets this server knows about.
    pub fn builtin() -> Result<Self> {
        let mut by_chain = BTreeMap::new();
        for (chain_id, pool, data_provider) in DEPLOYMENTS {
            let deployment = Deployment {
                pool: pool
                    .parse()
                    .with_context(|| format!("pool address for chain {}", chain_id))?,
                data_provider: data_provider
                    .parse()
                    .with_context(|| format!("data provider address for chain {}", chain_id))?,
            };
            by_chain.insert(*chain_id, deployment);
        }
        Ok(Self { by_chain })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (u64, Deployment)>) -> Self {
        Self {
            by_chain: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, chain_id: u64) -> Option<Deployment> {
        self.by_chain.get(&chain_id).copied()
    }

    /// Ascending.
    pub fn chain_ids(&self) -> Vec<u64> {
        self.by_chain.keys().copied().collect()
    }
}
