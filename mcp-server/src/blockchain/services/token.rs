// src/blockchain/services/token.rs

use anyhow::anyhow;
use ethers_core::abi::Token;
use ethers_core::types::{Address, U256};

use crate::blockchain::{
    abi::{decode_string, decode_uint256, encode_call, Selector},
    client::RpcBackend,
    models::{EvmError, TokenBalance},
    units::format_units,
};

pub const SELECTOR_DECIMALS: Selector = [0x31, 0x3c, 0xe5, 0x67]; // decimals()
pub const SELECTOR_SYMBOL: Selector = [0x95, 0xd8, 0x9b, 0x41]; // symbol()
pub const SELECTOR_BALANCE_OF: Selector = [0x70, 0xa0, 0x82, 0x31]; // balanceOf(address)

pub async fn get_decimals(backend: &dyn RpcBackend, token: Address) -> Result<u8, EvmError> {
    let data = backend
        .call(token, encode_call(SELECTOR_DECIMALS, &[]))
        .await
        .map_err(|e| EvmError::backend("call decimals()", e))?;
    let value = decode_uint256(&data, 0)?;
    if value > U256::from(u8::MAX) {
        return Err(EvmError::backend(
            "decode decimals()",
            anyhow!("value {} does not fit in uint8", value),
        ));
    }
    Ok(value.low_u32() as u8)
}

pub async fn get_symbol(backend: &dyn RpcBackend, token: Address) -> Result<String, EvmError> {
    let data = backend
        .call(token, encode_call(SELECTOR_SYMBOL, &[]))
        .await
        .map_err(|e| EvmError::backend("call symbol()", e))?;
    decode_string(&data)
}

pub async fn get_balance_of(
    backend: &dyn RpcBackend,
    token: Address,
    holder: Address,
) -> Result<U256, EvmError> {
    let data = backend
        .call(token, encode_call(SELECTOR_BALANCE_OF, &[Token::Address(holder)]))
        .await
        .map_err(|e| EvmError::backend("call balanceOf()", e))?;
    decode_uint256(&data, 0)
}

/// Balance, symbol and decimals of an ERC-20 holding.
pub async fn get_token_balance(
    backend: &dyn RpcBackend,
    token: Address,
    holder: Address,
) -> Result<TokenBalance, EvmError> {
    let decimals = get_decimals(backend, token).await?;
    let symbol = get_symbol(backend, token).await?;
    let raw = get_balance_of(backend, token, holder).await?;
    Ok(TokenBalance {
        balance: format_units(raw, decimals.into()),
        symbol,
        decimals,
    })
}
