//! Precision-safe decimal types for order and transfer amounts.
//!
//! Everything that reaches the wire is derived from `rust_decimal`
//! values. Binary floats never participate in price, size or USD math.

use crate::error::ValidationError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Micro-USD scale used by `ntli` and vault `usd` fields.
const MICRO_USD_DECIMALS: u32 = 6;

/// Render a decimal the way the exchange expects it: plain notation,
/// trailing zeros removed, `"0"` for zero.
pub fn wire_string(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.is_zero() {
        return "0".to_string();
    }
    normalized.to_string()
}

/// Truncate toward zero to at most `decimals` fractional digits.
#[inline]
pub fn truncate_decimals(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

/// Convert a USD amount into the exchange's signed micro-USD integer.
///
/// Fails when the amount carries more than six fractional digits or
/// does not fit an `i64`.
pub fn to_micro_usd(field: &'static str, value: Decimal) -> Result<i64, ValidationError> {
    let normalized = value.normalize();
    if normalized.scale() > MICRO_USD_DECIMALS {
        return Err(ValidationError::Precision {
            field,
            value,
            decimals: MICRO_USD_DECIMALS,
        });
    }
    normalized
        .checked_mul(Decimal::from(1_000_000u32))
        .and_then(|micro| micro.to_i64())
        .ok_or(ValidationError::OutOfRange { field, value })
}

/// Limit price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Wire representation (`"123.45"`, never `"123.450"`).
    pub fn to_wire(&self) -> String {
        wire_string(self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Order size with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn to_wire(&self) -> String {
        wire_string(self.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wire_string_strips_trailing_zeros() {
        assert_eq!(wire_string(dec!(1.500)), "1.5");
        assert_eq!(wire_string(dec!(100.00)), "100");
        assert_eq!(wire_string(dec!(0.000)), "0");
        assert_eq!(wire_string(dec!(0.00001234)), "0.00001234");
    }

    #[test]
    fn test_truncate_decimals_toward_zero() {
        assert_eq!(truncate_decimals(dec!(1.2399), 2), dec!(1.23));
        assert_eq!(truncate_decimals(dec!(-1.2399), 2), dec!(-1.23));
        assert_eq!(truncate_decimals(dec!(5), 3), dec!(5));
    }

    #[test]
    fn test_to_micro_usd() {
        assert_eq!(to_micro_usd("usd", dec!(1.5)).unwrap(), 1_500_000);
        assert_eq!(to_micro_usd("ntli", dec!(-0.25)).unwrap(), -250_000);
        assert_eq!(to_micro_usd("usd", dec!(0.000001)).unwrap(), 1);
        assert_eq!(to_micro_usd("usd", dec!(2.5000000)).unwrap(), 2_500_000);
    }

    #[test]
    fn test_to_micro_usd_rejects_excess_precision() {
        let err = to_micro_usd("usd", dec!(0.0000001)).unwrap_err();
        assert!(matches!(err, ValidationError::Precision { decimals: 6, .. }));
    }

    #[test]
    fn test_price_size_wire() {
        assert_eq!(Price::new(dec!(30000.0)).to_wire(), "30000");
        assert_eq!(Size::new(dec!(0.0100)).to_wire(), "0.01");
        assert!(Size::new(dec!(0.01)).is_positive());
        assert!(!Size::ZERO.is_positive());
        assert!(!Price::new(dec!(-1)).is_positive());
    }
}
