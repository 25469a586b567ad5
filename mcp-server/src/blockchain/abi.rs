// src/blockchain/abi.rs
//! Contract ABI helpers: static call data, scalar reads and the lenient
//! string decoding older tokens need.

use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, U256};

use crate::blockchain::models::EvmError;

pub const WORD: usize = 32;

pub type Selector = [u8; 4];

fn encode_word(token: Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&encode(&[token]));
    word
}

/// Left-pads a 20-byte address into a 32-byte word.
pub fn encode_address(address: Address) -> [u8; WORD] {
    encode_word(Token::Address(address))
}

/// Big-endian, right-aligned 32-byte word.
pub fn encode_uint256(value: U256) -> [u8; WORD] {
    encode_word(Token::Uint(value))
}

/// Selector followed by the ABI-encoded arguments.
pub fn encode_call(selector: Selector, args: &[Token]) -> Bytes {
    let mut out = selector.to_vec();
    out.extend(encode(args));
    Bytes::from(out)
}

fn word_at(data: &[u8], offset: usize) -> Result<U256, EvmError> {
    let needed = offset.saturating_add(WORD);
    let too_short = || EvmError::TooShort {
        needed,
        actual: data.len(),
    };
    let word = data.get(offset..needed).ok_or_else(too_short)?;
    decode(&[ParamType::Uint(256)], word)
        .ok()
        .and_then(|tokens| tokens.into_iter().next())
        .and_then(Token::into_uint)
        .ok_or_else(too_short)
}

pub fn decode_uint256(data: &[u8], offset: usize) -> Result<U256, EvmError> {
    word_at(data, offset)
}

/// True iff the word at `offset` is non-zero.
pub fn decode_bool(data: &[u8], offset: usize) -> Result<bool, EvmError> {
    Ok(!word_at(data, offset)?.is_zero())
}

/// Decodes a string return value.
///
/// Standard dynamic encoding (offset, length, bytes) is tried first. Tokens
/// that predate the standard return a bare `bytes32`, so on failure the first
/// word is read as NUL-padded printable ASCII.
pub fn decode_string(data: &[u8]) -> Result<String, EvmError> {
    if data.len() < WORD {
        return Err(EvmError::TooShort {
            needed: WORD,
            actual: data.len(),
        });
    }

    if let Some(s) = decode_dynamic_string(data) {
        return Ok(s);
    }

    let slot = &data[..WORD];
    let end = slot.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = &slot[..end];
    if !text.is_empty() && text.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Ok(String::from_utf8_lossy(text).into_owned());
    }

    Err(EvmError::UndecodableString(hex::encode(data)))
}

fn decode_dynamic_string(data: &[u8]) -> Option<String> {
    let offset = word_at(data, 0).ok()?;
    if offset < U256::from(WORD) || offset >= U256::from(data.len()) {
        return None;
    }
    let offset = offset.as_usize();

    let body_start = offset.checked_add(WORD)?;
    if body_start > data.len() {
        return None;
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[offset + 24..body_start]);
    let length = usize::try_from(u64::from_be_bytes(len_bytes)).ok()?;

    let body_end = body_start.checked_add(length)?;
    if body_end > data.len() {
        return None;
    }
    Some(String::from_utf8_lossy(&data[body_start..body_end]).into_owned())
}
