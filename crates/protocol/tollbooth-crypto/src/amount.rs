//! Fixed-point amounts.
//!
//! Prices travel as decimal strings in base-currency units ("0.001") and are
//! compared and hashed as integer base units with 18 fractional digits.

use crate::error::CryptoError;

/// Number of fractional digits in one base-currency unit.
pub const DECIMALS: u32 = 18;

/// Base units per whole currency unit (10^18).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

fn invalid(value: &str, reason: &str) -> CryptoError {
    CryptoError::InvalidAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a decimal amount string into base units.
///
/// # Example
/// ```
/// use tollbooth_crypto::parse_amount;
///
/// assert_eq!(parse_amount("0.001").unwrap(), 1_000_000_000_000_000);
/// assert_eq!(parse_amount("2").unwrap(), 2_000_000_000_000_000_000);
/// assert!(parse_amount("1e-3").is_err());
/// ```
pub fn parse_amount(value: &str) -> Result<u128, CryptoError> {
    let s = value.trim();
    if s.is_empty() {
        return Err(invalid(value, "empty"));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid(value, "no digits"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(value, "only digits and a single '.' are allowed"));
    }
    if frac.len() > DECIMALS as usize {
        return Err(invalid(value, "more than 18 fractional digits"));
    }

    let whole_units: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid(value, "integer part overflow"))?
    };

    let mut frac_units: u128 = 0;
    if !frac.is_empty() {
        let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
        frac_units = padded.parse().map_err(|_| invalid(value, "fraction overflow"))?;
    }

    whole_units
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| invalid(value, "amount overflow"))
}

/// Format base units as a decimal string, trimming trailing zeros.
///
/// # Example
/// ```
/// use tollbooth_crypto::format_amount;
///
/// assert_eq!(format_amount(1_000_000_000_000_000), "0.001");
/// assert_eq!(format_amount(3_000_000_000_000_000_000), "3");
/// ```
pub fn format_amount(base_units: u128) -> String {
    let whole = base_units / UNIT;
    let frac = base_units % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
