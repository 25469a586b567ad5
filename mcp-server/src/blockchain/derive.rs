// src/blockchain/derive.rs
//! Ethereum address derivation from a root public key and chain code.
//!
//! Only public material is available, so every path element is derived with
//! non-hardened BIP32 public derivation (CKDpub). Hardened markers in the path
//! are ignored.

use ethers_core::types::Address;
use ethers_core::utils::keccak256;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::group::Curve;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha2::Sha512;

use crate::blockchain::models::EvmError;
use crate::utils::strip_hex_prefix;

pub const ETHEREUM_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

const HARDENED_OFFSET: u32 = 0x8000_0000;

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], EvmError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|e| EvmError::InvalidKeyMaterial(format!("hmac key: {}", e)))?;
    mac.update(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Child key derivation, public parent to public child.
fn ckd_pub(
    parent: &PublicKey,
    chain_code: &[u8; 32],
    index: u32,
) -> Result<(PublicKey, [u8; 32]), EvmError> {
    if index >= HARDENED_OFFSET {
        return Err(EvmError::InvalidKeyMaterial(format!(
            "hardened index {} needs a private key",
            index
        )));
    }

    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(parent.to_encoded_point(true).as_bytes());
    data.extend_from_slice(&index.to_be_bytes());
    let digest = hmac_sha512(chain_code, &data)?;

    let tweak = SecretKey::from_slice(&digest[..32]).map_err(|_| {
        EvmError::InvalidKeyMaterial(format!("tweak out of range at index {}", index))
    })?;
    let point = tweak.public_key().to_projective() + parent.to_projective();
    let child = PublicKey::from_affine(point.to_affine()).map_err(|_| {
        EvmError::InvalidKeyMaterial(format!("child at index {} is the point at infinity", index))
    })?;

    let mut child_chain_code = [0u8; 32];
    child_chain_code.copy_from_slice(&digest[32..]);
    Ok((child, child_chain_code))
}

fn parse_path(path: &str) -> Result<Vec<u32>, EvmError> {
    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(EvmError::InvalidKeyMaterial(format!("bad derivation path {:?}", path)));
    }
    parts
        .map(|p| {
            p.trim_end_matches('\'')
                .parse::<u32>()
                .ok()
                .filter(|i| *i < HARDENED_OFFSET)
                .ok_or_else(|| {
                    EvmError::InvalidKeyMaterial(format!("bad path element {:?} in {:?}", p, path))
                })
        })
        .collect()
}

fn decode_hex(label: &str, value: &str) -> Result<Vec<u8>, EvmError> {
    hex::decode(strip_hex_prefix(value.trim()))
        .map_err(|e| EvmError::InvalidKeyMaterial(format!("{} is not hex: {}", label, e)))
}

/// Walks `path` from a hex-encoded SEC1 root public key and 32-byte chain code.
pub fn derive_public_key(
    root_public_key_hex: &str,
    chain_code_hex: &str,
    path: &str,
) -> Result<PublicKey, EvmError> {
    let root = PublicKey::from_sec1_bytes(&decode_hex("public key", root_public_key_hex)?)
        .map_err(|_| EvmError::InvalidKeyMaterial("public key is not a secp256k1 point".into()))?;
    let chain_code: [u8; 32] = decode_hex("chain code", chain_code_hex)?
        .try_into()
        .map_err(|_| EvmError::InvalidKeyMaterial("chain code must be 32 bytes".into()))?;

    let (key, _) = parse_path(path)?
        .into_iter()
        .try_fold((root, chain_code), |(key, cc), index| ckd_pub(&key, &cc, index))?;
    Ok(key)
}

/// Last 20 bytes of keccak256 over the uncompressed point (without the 0x04 tag).
pub fn public_key_to_address(key: &PublicKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// An Ethereum account derived from session key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccount {
    pub address: Address,
    /// Compressed SEC1 hex of the derived key.
    pub public_key_hex: String,
}

pub fn derive_evm_account(
    root_public_key_hex: &str,
    chain_code_hex: &str,
) -> Result<DerivedAccount, EvmError> {
    let key = derive_public_key(root_public_key_hex, chain_code_hex, ETHEREUM_DERIVATION_PATH)?;
    Ok(DerivedAccount {
        address: public_key_to_address(&key),
        public_key_hex: hex::encode(key.to_encoded_point(true).as_bytes()),
    })
}
