//! Fixed-point money arithmetic
//!
//! Amounts are carried as integer minor units (cents). Conversion to a
//! decimal major-unit value only happens when a figure leaves the crate.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minor units in one major unit for every supported currency
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Basis points in 100%
pub const BASIS_POINTS: i64 = 10_000;

/// ISO-4217 style currency code (e.g. "NZD")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a currency code, normalised to upper case
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn nzd() -> Self {
        Self::new("NZD")
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// An amount in minor units together with its currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_cents: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    pub fn nzd(amount_cents: i64) -> Self {
        Self::new(amount_cents, Currency::nzd())
    }

    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Decimal major-unit value, e.g. 15_000 cents -> 150.00
    pub fn to_major(&self) -> BigDecimal {
        to_major(self.amount_cents)
    }

    /// Display form used in statements and audit summaries: `NZD $150.00`
    pub fn format_amount(&self) -> String {
        format!("{} ${}", self.currency, self.to_major())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_amount())
    }
}

/// Convert minor units to a two-decimal major-unit value
pub fn to_major(amount_cents: i64) -> BigDecimal {
    BigDecimal::new(amount_cents.into(), 2)
}

/// Convert major units to minor units
pub fn major_to_cents(major: i64) -> i64 {
    major * MINOR_UNITS_PER_MAJOR
}

/// Integer division rounding half away from zero.
///
/// `denominator` must be positive.
pub fn divide_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    if numerator >= 0 {
        (2 * numerator + denominator) / (2 * denominator)
    } else {
        -((2 * -numerator + denominator) / (2 * denominator))
    }
}

/// Split a tax-inclusive amount into its tax-exclusive part.
///
/// `exclusive = round_half_up(inclusive / (1 + rate))`, computed exactly on
/// integers. The GST component is always `inclusive - exclusive`.
pub fn gst_exclusive(inclusive_cents: i64, rate_basis_points: i64) -> i64 {
    let numerator = i128::from(inclusive_cents) * i128::from(BASIS_POINTS);
    let denominator = i128::from(BASIS_POINTS + rate_basis_points);
    divide_round_half_up(numerator, denominator) as i64
}

/// GST component of a tax-inclusive amount
pub fn gst_component(inclusive_cents: i64, rate_basis_points: i64) -> i64 {
    inclusive_cents - gst_exclusive(inclusive_cents, rate_basis_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_major_unit_conversion() {
        assert_eq!(to_major(15_000), BigDecimal::from_str("150.00").unwrap());
        assert_eq!(to_major(5), BigDecimal::from_str("0.05").unwrap());
        assert_eq!(Money::nzd(1_234_567).format_amount(), "NZD $12345.67");
    }

    #[test]
    fn test_currency_normalisation() {
        assert_eq!(Currency::new(" nzd "), Currency::nzd());
        assert_eq!(Currency::from("aud").code(), "AUD");
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(divide_round_half_up(3, 2), 2);
        assert_eq!(divide_round_half_up(5, 2), 3);
        assert_eq!(divide_round_half_up(7, 3), 2);
        assert_eq!(divide_round_half_up(-3, 2), -2);
        assert_eq!(divide_round_half_up(0, 7), 0);
    }

    #[test]
    fn test_gst_exclusive_standard_rate() {
        assert_eq!(gst_exclusive(1_150_000_000, 1500), 1_000_000_000);
        assert_eq!(gst_component(1_150_000_000, 1500), 150_000_000);
        assert_eq!(gst_exclusive(115, 1500), 100);
        // 100 / 1.15 = 86.956...
        assert_eq!(gst_exclusive(100, 1500), 87);
        assert_eq!(gst_component(100, 1500), 13);
    }

    #[test]
    fn test_gst_exact_half_rounds_up() {
        // At 15% an exact half-cent quotient cannot occur, so pin the
        // rounding mode with a 100% rate: 3 / 2 = 1.5 -> 2
        assert_eq!(gst_exclusive(3, 10_000), 2);
        assert_eq!(gst_component(3, 10_000), 1);
    }

    #[test]
    fn test_gst_split_is_exact_and_non_negative() {
        for inclusive in (1..5_000).chain([999_999, 1_000_001, 123_456_789]) {
            let exclusive = gst_exclusive(inclusive, 1500);
            let gst = gst_component(inclusive, 1500);
            assert_eq!(exclusive + gst, inclusive);
            assert!(gst >= 0, "negative GST for {}", inclusive);
        }
    }
}
