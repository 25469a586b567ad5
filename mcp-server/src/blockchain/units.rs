// src/blockchain/units.rs

use ethers_core::types::U256;

use crate::blockchain::models::EvmError;

/// Formats a base-unit amount as a human-readable decimal string.
///
/// Works on the decimal digits of `amount` directly so any `decimals` value is
/// accepted, including ones where `10^decimals` would not fit in 256 bits.
pub fn format_units(amount: U256, decimals: u32) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Parses a human-readable amount into base units.
///
/// `"max"` (any case) maps to `U256::MAX`. Excess fractional digits are
/// truncated, never rounded.
pub fn parse_amount(input: &str, decimals: u32) -> Result<U256, EvmError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("max") {
        return Ok(U256::MAX);
    }

    let invalid = || EvmError::InvalidAmount(input.to_string());

    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(invalid());
    }

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(if whole.is_empty() { "0" } else { whole });
    digits.extend(frac.chars().take(decimals));
    for _ in frac.len().min(decimals)..decimals {
        digits.push('0');
    }

    let normalized = digits.trim_start_matches('0');
    let normalized = if normalized.is_empty() { "0" } else { normalized };
    U256::from_dec_str(normalized).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_zero_is_always_zero() {
        for d in [0, 1, 6, 18, 77, 100] {
            assert_eq!(format_units(U256::zero(), d), "0");
        }
    }

    #[test]
    fn format_known_values() {
        let one_eth = U256::exp10(18);
        assert_eq!(format_units(one_eth, 18), "1");
        assert_eq!(format_units(U256::one(), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(123u64), 0), "123");
        assert_eq!(format_units(U256::from(100_000_000u64), 6), "100");
    }

    #[test]
    fn format_handles_decimals_beyond_u256_range() {
        assert_eq!(format_units(U256::from(5u64), 80), format!("0.{}5", "0".repeat(79)));
    }

    #[test]
    fn parse_max_sentinel_ignores_case() {
        assert_eq!(parse_amount("max", 18).unwrap(), U256::MAX);
        assert_eq!(parse_amount("MAX", 6).unwrap(), U256::MAX);
        assert_eq!(parse_amount("  Max ", 0).unwrap(), U256::MAX);
    }

    #[test]
    fn parse_truncates_excess_precision() {
        assert_eq!(parse_amount("1.1234567", 6).unwrap(), U256::from(1_123_456u64));
        assert_eq!(parse_amount("0.9999999", 6).unwrap(), U256::from(999_999u64));
    }

    #[test]
    fn parse_pads_and_defaults_integer_part() {
        assert_eq!(parse_amount("100.5", 6).unwrap(), U256::from(100_500_000u64));
        assert_eq!(parse_amount(".5", 2).unwrap(), U256::from(50u64));
        assert_eq!(parse_amount("7.", 2).unwrap(), U256::from(700u64));
        assert_eq!(parse_amount("007", 0).unwrap(), U256::from(7u64));
        assert_eq!(parse_amount("0.0", 18).unwrap(), U256::zero());
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "   ", ".", "1.2.3", "abc", "-1", "1e18", "1,5", "0x10"] {
            assert!(
                matches!(parse_amount(bad, 18), Err(EvmError::InvalidAmount(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let too_big = format!("{}0", U256::MAX);
        assert!(matches!(parse_amount(&too_big, 0), Err(EvmError::InvalidAmount(_))));
    }

    #[test]
    fn format_then_parse_recovers_amount() {
        let samples = [
            (U256::one(), 18),
            (U256::from(1_500_000u64), 6),
            (U256::from(42u64), 0),
            (U256::MAX, 18),
            (U256::exp10(30) + U256::from(7u64), 27),
        ];
        for (amount, decimals) in samples {
            let text = format_units(amount, decimals);
            assert_eq!(parse_amount(&text, decimals).unwrap(), amount, "via {}", text);
        }
    }
}
