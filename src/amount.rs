//! SUI Amount Conversion
//!
//! 1 SUI = 10^9 MIST. Decimal inputs are converted exactly as
//! `floor(decimal * 10^9)`: digits past the ninth decimal place are
//! truncated, never rounded up.

use crate::error::{CustodyError, CustodyResult};

/// Decimal places of the native token
pub const SUI_DECIMALS: u32 = 9;

/// MIST per SUI
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Convert a decimal SUI string (`"1.5"`, `"0.000000001"`, `"42"`) to MIST.
///
/// Zero is a valid conversion result; whether zero may be transferred is
/// decided by [`require_transfer_amount`].
pub fn sui_to_mist(amount: &str) -> CustodyResult<u64> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(CustodyError::invalid_amount("Amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(CustodyError::invalid_amount(format!("Amount cannot be negative: {}", trimmed)));
    }

    let (integer_str, fractional_str) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if integer_str.is_empty() && fractional_str.is_empty() {
        return Err(CustodyError::invalid_amount(format!("Invalid amount: {}", trimmed)));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(integer_str) || !all_digits(fractional_str) {
        return Err(CustodyError::invalid_amount(format!("Invalid amount: {}", trimmed)));
    }

    let integer: u128 = if integer_str.is_empty() {
        0
    } else {
        integer_str
            .parse()
            .map_err(|_| CustodyError::invalid_amount(format!("Amount overflow: {}", trimmed)))?
    };

    // Truncate to MIST precision, then pad
    let kept = &fractional_str[..fractional_str.len().min(SUI_DECIMALS as usize)];
    let padded = format!("{:0<width$}", kept, width = SUI_DECIMALS as usize);
    let fractional: u128 = padded
        .parse()
        .map_err(|_| CustodyError::invalid_amount(format!("Invalid fractional part: {}", trimmed)))?;

    let raw = integer
        .checked_mul(MIST_PER_SUI as u128)
        .and_then(|v| v.checked_add(fractional))
        .ok_or_else(|| CustodyError::invalid_amount(format!("Amount overflow: {}", trimmed)))?;

    u64::try_from(raw)
        .map_err(|_| CustodyError::invalid_amount(format!("Amount exceeds u64 MIST: {}", trimmed)))
}

/// Format MIST as a decimal SUI string without trailing zeros
pub fn mist_to_sui(mist: u128) -> String {
    let multiplier = MIST_PER_SUI as u128;
    let integer = mist / multiplier;
    let fractional = mist % multiplier;

    if fractional == 0 {
        integer.to_string()
    } else {
        let frac_str = format!("{:0>width$}", fractional, width = SUI_DECIMALS as usize);
        format!("{}.{}", integer, frac_str.trim_end_matches('0'))
    }
}

/// A transfer must move at least one MIST
pub fn require_transfer_amount(amount_mist: u64) -> CustodyResult<u64> {
    if amount_mist == 0 {
        return Err(CustodyError::invalid_amount("Amount cannot be zero"));
    }
    Ok(amount_mist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_whole_and_decimal() {
        assert_eq!(sui_to_mist("1").unwrap(), 1_000_000_000);
        assert_eq!(sui_to_mist("1.5").unwrap(), 1_500_000_000);
        assert_eq!(sui_to_mist("0.000000001").unwrap(), 1);
        assert_eq!(sui_to_mist(".25").unwrap(), 250_000_000);
        assert_eq!(sui_to_mist("2.").unwrap(), 2_000_000_000);
        assert_eq!(sui_to_mist(" 3 ").unwrap(), 3_000_000_000);
    }

    #[test]
    fn test_sub_mist_truncates() {
        assert_eq!(sui_to_mist("0.0000000001").unwrap(), 0);
        assert_eq!(sui_to_mist("1.9999999999").unwrap(), 1_999_999_999);
    }

    #[test]
    fn test_zero_transfer_rejected() {
        let mist = sui_to_mist("0.0000000001").unwrap();
        let err = require_transfer_amount(mist).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "-1", "abc", "1.2.3", "1e9", ".", "0x10", "+1"] {
            let err = sui_to_mist(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidAmount, "input {:?}", bad);
        }
    }

    #[test]
    fn test_overflow() {
        // u64::MAX MIST is 18446744073.709551615 SUI
        assert_eq!(sui_to_mist("18446744073.709551615").unwrap(), u64::MAX);
        assert!(sui_to_mist("18446744073.709551616").is_err());
        assert!(sui_to_mist("99999999999999999999999999999999999999999").is_err());
    }

    #[test]
    fn test_mist_to_sui() {
        assert_eq!(mist_to_sui(0), "0");
        assert_eq!(mist_to_sui(1_500_000_000), "1.5");
        assert_eq!(mist_to_sui(1), "0.000000001");
        assert_eq!(mist_to_sui(42 * MIST_PER_SUI as u128), "42");
    }
}
