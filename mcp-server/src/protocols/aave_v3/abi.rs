// src/protocols/aave_v3/abi.rs
//! Call data and return decoding for the Aave V3 Pool and PoolDataProvider.

use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, U256};
use rust_decimal::Decimal;

use crate::blockchain::abi::{decode_bool, decode_uint256, encode_call, Selector, WORD};
use crate::blockchain::models::EvmError;

// Pool
pub const SELECTOR_SUPPLY: Selector = [0x61, 0x7b, 0xa0, 0x37]; // supply(address,uint256,address,uint16)
pub const SELECTOR_WITHDRAW: Selector = [0x69, 0x32, 0x8d, 0xec]; // withdraw(address,uint256,address)
pub const SELECTOR_BORROW: Selector = [0xa4, 0x15, 0xbc, 0xad]; // borrow(address,uint256,uint256,uint16,address)
pub const SELECTOR_REPAY: Selector = [0x57, 0x3a, 0xde, 0x81]; // repay(address,uint256,uint256,address)
pub const SELECTOR_GET_USER_ACCOUNT_DATA: Selector = [0xbf, 0x92, 0x85, 0x7c]; // getUserAccountData(address)

// PoolDataProvider
pub const SELECTOR_GET_RESERVE_DATA: Selector = [0x35, 0xea, 0x6a, 0x75]; // getReserveData(address)
pub const SELECTOR_GET_RESERVE_CONFIG_DATA: Selector = [0x3e, 0x15, 0x01, 0x41]; // getReserveConfigurationData(address)

// ERC-20
pub const SELECTOR_APPROVE: Selector = [0x09, 0x5e, 0xa7, 0xb3]; // approve(address,uint256)

/// `interestRateMode` for variable-rate debt.
pub const VARIABLE_RATE_MODE: u64 = 2;
pub const REFERRAL_CODE: u64 = 0;

/// `approve(spender, amount)`
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(SELECTOR_APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

/// `supply(asset, amount, onBehalfOf, referralCode = 0)`
pub fn encode_supply(asset: Address, amount: U256, on_behalf_of: Address) -> Bytes {
    encode_call(
        SELECTOR_SUPPLY,
        &[
            Token::Address(asset),
            Token::Uint(amount),
            Token::Address(on_behalf_of),
            Token::Uint(REFERRAL_CODE.into()),
        ],
    )
}

/// `withdraw(asset, amount, to)`
pub fn encode_withdraw(asset: Address, amount: U256, to: Address) -> Bytes {
    encode_call(
        SELECTOR_WITHDRAW,
        &[Token::Address(asset), Token::Uint(amount), Token::Address(to)],
    )
}

/// `borrow(asset, amount, interestRateMode = 2, referralCode = 0, onBehalfOf)`
pub fn encode_borrow(asset: Address, amount: U256, on_behalf_of: Address) -> Bytes {
    encode_call(
        SELECTOR_BORROW,
        &[
            Token::Address(asset),
            Token::Uint(amount),
            Token::Uint(VARIABLE_RATE_MODE.into()),
            Token::Uint(REFERRAL_CODE.into()),
            Token::Address(on_behalf_of),
        ],
    )
}

/// `repay(asset, amount, interestRateMode = 2, onBehalfOf)`
pub fn encode_repay(asset: Address, amount: U256, on_behalf_of: Address) -> Bytes {
    encode_call(
        SELECTOR_REPAY,
        &[
            Token::Address(asset),
            Token::Uint(amount),
            Token::Uint(VARIABLE_RATE_MODE.into()),
            Token::Address(on_behalf_of),
        ],
    )
}

pub fn encode_get_user_account_data(user: Address) -> Bytes {
    encode_call(SELECTOR_GET_USER_ACCOUNT_DATA, &[Token::Address(user)])
}

pub fn encode_get_reserve_data(asset: Address) -> Bytes {
    encode_call(SELECTOR_GET_RESERVE_DATA, &[Token::Address(asset)])
}

pub fn encode_get_reserve_config_data(asset: Address) -> Bytes {
    encode_call(SELECTOR_GET_RESERVE_CONFIG_DATA, &[Token::Address(asset)])
}

fn require_words(data: &[u8], words: usize) -> Result<(), EvmError> {
    let needed = words * WORD;
    if data.len() < needed {
        return Err(EvmError::TooShort {
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

/// `getUserAccountData` return, six words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccountData {
    /// word 0, 8-decimal USD
    pub total_collateral_base: U256,
    /// word 1, 8-decimal USD
    pub total_debt_base: U256,
    /// word 2, 8-decimal USD
    pub available_borrows_base: U256,
    /// word 3, bps
    pub current_liquidation_threshold: U256,
    /// word 4, bps
    pub ltv: U256,
    /// word 5, WAD (1e18 = 1.0)
    pub health_factor: U256,
}

pub fn decode_user_account_data(data: &[u8]) -> Result<UserAccountData, EvmError> {
    require_words(data, 6)?;
    Ok(UserAccountData {
        total_collateral_base: decode_uint256(data, 0)?,
        total_debt_base: decode_uint256(data, 32)?,
        available_borrows_base: decode_uint256(data, 64)?,
        current_liquidation_threshold: decode_uint256(data, 96)?,
        ltv: decode_uint256(data, 128)?,
        health_factor: decode_uint256(data, 160)?,
    })
}

/// Rates from the data provider's `getReserveData`. The full return is
/// (unbacked, accruedToTreasuryScaled, totalAToken, totalStableDebt,
/// totalVariableDebt, liquidityRate, variableBorrowRate, ...); only words 5
/// and 6 are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveData {
    /// word 5, RAY
    pub liquidity_rate: U256,
    /// word 6, RAY
    pub variable_borrow_rate: U256,
}

pub fn decode_reserve_data(data: &[u8]) -> Result<ReserveData, EvmError> {
    require_words(data, 7)?;
    Ok(ReserveData {
        liquidity_rate: decode_uint256(data, 160)?,
        variable_borrow_rate: decode_uint256(data, 192)?,
    })
}

/// `getReserveConfigurationData` return, nine words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveConfigData {
    pub decimals: U256,
    /// bps
    pub ltv: U256,
    /// bps
    pub liquidation_threshold: U256,
    /// bps, 10500 means a 5% bonus
    pub liquidation_bonus: U256,
    /// bps
    pub reserve_factor: U256,
    pub usage_as_collateral_enabled: bool,
    pub borrowing_enabled: bool,
    pub is_active: bool,
    pub is_frozen: bool,
}

pub fn decode_reserve_config_data(data: &[u8]) -> Result<ReserveConfigData, EvmError> {
    require_words(data, 9)?;
    Ok(ReserveConfigData {
        decimals: decode_uint256(data, 0)?,
        ltv: decode_uint256(data, 32)?,
        liquidation_threshold: decode_uint256(data, 64)?,
        liquidation_bonus: decode_uint256(data, 96)?,
        reserve_factor: decode_uint256(data, 128)?,
        usage_as_collateral_enabled: decode_bool(data, 160)?,
        borrowing_enabled: decode_bool(data, 192)?,
        is_active: decode_bool(data, 224)?,
        is_frozen: decode_bool(data, 256)?,
    })
}

// Largest mantissa a Decimal can hold.
const DECIMAL_MANTISSA_BITS: usize = 96;

fn hundredths_to_decimal(hundredths: U256) -> Decimal {
    if hundredths.bits() > DECIMAL_MANTISSA_BITS {
        return Decimal::MAX;
    }
    Decimal::from_i128_with_scale(hundredths.as_u128() as i128, 2)
}

/// RAY (1e27 = 100%) to a percentage, rounded half away from zero to two
/// places. Integer arithmetic throughout.
pub fn ray_to_percentage(ray: U256) -> Decimal {
    // percent = ray / 1e25, so hundredths = ray / 1e23 rounded.
    let unit = U256::exp10(23);
    let half = U256::exp10(23) / 2;
    hundredths_to_decimal(ray.saturating_add(half) / unit)
}

/// Basis points to a percentage (10000 bps = 100.00).
pub fn bps_to_percentage(bps: U256) -> Decimal {
    hundredths_to_decimal(bps)
}
