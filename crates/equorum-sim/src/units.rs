//! Decimal amounts with 18 fractional digits.
//!
//! Scenario files and reports express value and token amounts as decimal
//! strings ("10", "0.2", "1_000") so they stay exact for `u128` base units.

use equorum_core::constants::{TOKEN_DECIMALS, UNIT};

use crate::error::SimError;

/// Parse a decimal amount into base units. Underscores are ignored.
pub fn parse_units(input: &str) -> Result<u128, SimError> {
    let invalid = |reason: &str| SimError::InvalidAmount { input: input.to_string(), reason: reason.to_string() };

    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err(invalid("empty"));
    }
    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if frac.len() > TOKEN_DECIMALS as usize {
        return Err(invalid("more than 18 fractional digits"));
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid("too large"))? };
    let mut frac_units: u128 = 0;
    for (i, digit) in frac.bytes().enumerate() {
        let place = 10u128.pow(TOKEN_DECIMALS as u32 - 1 - i as u32);
        frac_units += u128::from(digit - b'0') * place;
    }
    whole
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| invalid("too large"))
}

/// Format base units as a decimal string without trailing zeros.
pub fn format_units(amount: u128) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = TOKEN_DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!(parse_units("10").unwrap(), 10 * UNIT);
        assert_eq!(parse_units("0.2").unwrap(), UNIT / 5);
        assert_eq!(parse_units(".5").unwrap(), UNIT / 2);
        assert_eq!(parse_units("1_000_000").unwrap(), 1_000_000 * UNIT);
        assert_eq!(parse_units("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", ".", "1.2.3", "-1", "abc", "1e18", "0.0000000000000000001"] {
            assert!(parse_units(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_units("999999999999999999999999").is_err());
    }

    #[test]
    fn formats_without_trailing_zeros() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(10 * UNIT), "10");
        assert_eq!(format_units(UNIT / 5), "0.2");
        assert_eq!(format_units(1), "0.000000000000000001");
    }
}
