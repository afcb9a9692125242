//! Market identification and precision rules.
//!
//! Callers name markets with symbols such as `"BTC-PERP"` or
//! `"PURR-SPOT"`. The exchange names them differently (`"BTC"`,
//! `"PURR/USDC"`, `"@107"`) and addresses them by asset index.

use crate::decimal::{truncate_decimals, wire_string, Price, Size};
use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum significant figures the exchange accepts in a price.
pub const MAX_PRICE_SIG_FIGS: u32 = 5;

/// Decimal budget for perp prices before subtracting `szDecimals`.
pub const PERP_MAX_DECIMALS: u32 = 6;

/// Decimal budget for spot prices before subtracting `szDecimals`.
pub const SPOT_MAX_DECIMALS: u32 = 8;

/// Spot asset indices start here on the wire.
pub const SPOT_ASSET_OFFSET: u32 = 10_000;

/// Quote token whose pairs get the bare `<BASE>-SPOT` symbol.
pub const USDC_QUOTE: &str = "USDC";

/// Perpetual or spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Perp,
    Spot,
}

impl MarketKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Perp => "PERP",
            Self::Spot => "SPOT",
        }
    }

    /// Maximum decimals for a price before `szDecimals` is subtracted.
    pub fn price_decimal_budget(&self) -> u32 {
        match self {
            Self::Perp => PERP_MAX_DECIMALS,
            Self::Spot => SPOT_MAX_DECIMALS,
        }
    }
}

/// Caller-facing market symbol: `<BASE>-PERP` or `<BASE>-SPOT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: String,
    kind: MarketKind,
}

impl Symbol {
    pub fn new(base: impl Into<String>, kind: MarketKind) -> Self {
        Self {
            base: base.into(),
            kind,
        }
    }

    pub fn perp(base: impl Into<String>) -> Self {
        Self::new(base, MarketKind::Perp)
    }

    pub fn spot(base: impl Into<String>) -> Self {
        Self::new(base, MarketKind::Spot)
    }

    /// Spot symbol for a `base`/`quote` pair. USDC pairs take the bare
    /// `<BASE>-SPOT`; any other quote gives `<BASE>/<QUOTE>-SPOT`.
    pub fn spot_pair(base: &str, quote: &str) -> Self {
        if quote == USDC_QUOTE {
            Self::spot(base)
        } else {
            Self::spot(format!("{base}/{quote}"))
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn kind(&self) -> MarketKind {
        self.kind
    }

    pub fn is_spot(&self) -> bool {
        self.kind == MarketKind::Spot
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.kind.suffix())
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, suffix) = s
            .rsplit_once('-')
            .ok_or_else(|| ValidationError::InvalidSymbol(s.to_string()))?;
        if base.is_empty() {
            return Err(ValidationError::InvalidSymbol(s.to_string()));
        }
        let kind = match suffix.to_ascii_uppercase().as_str() {
            "PERP" => MarketKind::Perp,
            "SPOT" => MarketKind::Spot,
            _ => return Err(ValidationError::InvalidSymbol(s.to_string())),
        };
        Ok(Self::new(base, kind))
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

/// Everything the encoder needs to address one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSpec {
    pub symbol: Symbol,
    /// Coin name the exchange uses (`"BTC"`, `"PURR/USDC"`, `"@107"`).
    pub wire_name: String,
    /// Asset index used in signed actions.
    pub asset: u32,
    /// Size decimals (`szDecimals`).
    pub sz_decimals: u32,
    /// Maximum leverage, perps only.
    pub max_leverage: Option<u32>,
}

impl MarketSpec {
    pub fn kind(&self) -> MarketKind {
        self.symbol.kind()
    }

    /// Maximum price decimals for this market.
    pub fn max_price_decimals(&self) -> u32 {
        self.kind()
            .price_decimal_budget()
            .saturating_sub(self.sz_decimals)
    }

    /// Truncate a price to the exchange's tick rules.
    ///
    /// At most five significant figures and at most
    /// `max_price_decimals()` decimals. A price whose integer part alone
    /// has five or more digits is truncated to an integer, since integer
    /// prices are always accepted.
    pub fn truncate_price(&self, price: Price) -> Result<Price, ValidationError> {
        if !price.is_positive() {
            return Err(ValidationError::NonPositive {
                field: "price",
                value: price.inner(),
            });
        }
        let value = price.inner();
        let truncated = match sig_fig_decimals(value) {
            Some(dp) => truncate_decimals(value, dp.min(self.max_price_decimals())),
            None => value.trunc(),
        };
        if truncated.is_zero() {
            return Err(ValidationError::Precision {
                field: "price",
                value,
                decimals: self.max_price_decimals(),
            });
        }
        Ok(Price::new(truncated))
    }

    /// Truncate a size to `sz_decimals`.
    pub fn truncate_size(&self, size: Size) -> Result<Size, ValidationError> {
        if !size.is_positive() {
            return Err(ValidationError::NonPositive {
                field: "size",
                value: size.inner(),
            });
        }
        let truncated = truncate_decimals(size.inner(), self.sz_decimals);
        if truncated.is_zero() {
            return Err(ValidationError::Precision {
                field: "size",
                value: size.inner(),
                decimals: self.sz_decimals,
            });
        }
        Ok(Size::new(truncated))
    }

    pub fn format_price(&self, price: Price) -> Result<String, ValidationError> {
        self.truncate_price(price).map(|p| wire_string(p.inner()))
    }

    pub fn format_size(&self, size: Size) -> Result<String, ValidationError> {
        self.truncate_size(size).map(|s| wire_string(s.inner()))
    }
}

/// Decimals allowed by the significant-figure limit, or `None` when the
/// integer part already uses all of them.
fn sig_fig_decimals(value: Decimal) -> Option<u32> {
    let magnitude = magnitude(value);
    let allowed = MAX_PRICE_SIG_FIGS as i64 - 1 - magnitude;
    if allowed < 0 {
        None
    } else {
        Some(allowed as u32)
    }
}

/// Base-10 exponent of the leading digit: 12345 -> 4, 0.00123 -> -3.
fn magnitude(value: Decimal) -> i64 {
    let normalized = value.abs().normalize();
    let digits = normalized.mantissa().to_string().len() as i64;
    digits - 1 - normalized.scale() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn perp(sz_decimals: u32) -> MarketSpec {
        MarketSpec {
            symbol: Symbol::perp("BTC"),
            wire_name: "BTC".to_string(),
            asset: 0,
            sz_decimals,
            max_leverage: Some(50),
        }
    }

    fn spot(sz_decimals: u32) -> MarketSpec {
        MarketSpec {
            symbol: Symbol::spot("PURR"),
            wire_name: "PURR/USDC".to_string(),
            asset: SPOT_ASSET_OFFSET,
            sz_decimals,
            max_leverage: None,
        }
    }

    #[test]
    fn test_symbol_parse() {
        let s: Symbol = "BTC-PERP".parse().unwrap();
        assert_eq!(s.base(), "BTC");
        assert_eq!(s.kind(), MarketKind::Perp);

        let s: Symbol = "PURR-spot".parse().unwrap();
        assert!(s.is_spot());
        assert_eq!(s.to_string(), "PURR-SPOT");

        assert!("BTC".parse::<Symbol>().is_err());
        assert!("-PERP".parse::<Symbol>().is_err());
        assert!("BTC-FUTURE".parse::<Symbol>().is_err());
    }

    #[test]
    fn test_spot_pair_symbol() {
        assert_eq!(Symbol::spot_pair("HYPE", "USDC").to_string(), "HYPE-SPOT");
        let usdh = Symbol::spot_pair("HYPE", "USDH");
        assert_eq!(usdh.to_string(), "HYPE/USDH-SPOT");
        assert_eq!("HYPE/USDH-SPOT".parse::<Symbol>().unwrap(), usdh);
    }

    #[test]
    fn test_symbol_with_dash_in_base() {
        let s: Symbol = "K-PEPE-PERP".parse().unwrap();
        assert_eq!(s.base(), "K-PEPE");
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(magnitude(dec!(12345)), 4);
        assert_eq!(magnitude(dec!(1234.5)), 3);
        assert_eq!(magnitude(dec!(1.000)), 0);
        assert_eq!(magnitude(dec!(0.123)), -1);
        assert_eq!(magnitude(dec!(0.00123)), -3);
    }

    #[test]
    fn test_price_sig_figs() {
        let spec = perp(0);
        assert_eq!(spec.format_price(Price::new(dec!(1234.56))).unwrap(), "1234.5");
        assert_eq!(spec.format_price(Price::new(dec!(123.456))).unwrap(), "123.45");
        assert_eq!(spec.format_price(Price::new(dec!(1.234567))).unwrap(), "1.2345");
    }

    #[test]
    fn test_integer_prices_always_allowed() {
        let spec = perp(5);
        assert_eq!(spec.format_price(Price::new(dec!(30000))).unwrap(), "30000");
        assert_eq!(spec.format_price(Price::new(dec!(123456))).unwrap(), "123456");
        assert_eq!(spec.format_price(Price::new(dec!(123456.78))).unwrap(), "123456");
    }

    #[test]
    fn test_price_decimal_budget() {
        // 6 - 4 = 2 decimals for perps
        assert_eq!(perp(4).format_price(Price::new(dec!(1.23456))).unwrap(), "1.23");
        // 8 - 4 = 4 decimals for spot
        assert_eq!(spot(4).format_price(Price::new(dec!(1.23456))).unwrap(), "1.2345");
        assert_eq!(spot(0).format_price(Price::new(dec!(0.000012345))).unwrap(), "0.00001234");
    }

    #[test]
    fn test_price_truncating_to_zero_rejected() {
        let err = perp(5).format_price(Price::new(dec!(0.001))).unwrap_err();
        assert!(matches!(err, ValidationError::Precision { field: "price", .. }));
    }

    #[test]
    fn test_non_positive_rejected() {
        assert!(matches!(
            perp(3).format_price(Price::new(dec!(-1))),
            Err(ValidationError::NonPositive { .. })
        ));
        assert!(matches!(
            perp(3).format_size(Size::ZERO),
            Err(ValidationError::NonPositive { .. })
        ));
    }

    #[test]
    fn test_size_truncation() {
        let spec = perp(3);
        assert_eq!(spec.format_size(Size::new(dec!(1.23456))).unwrap(), "1.234");
        assert_eq!(spec.format_size(Size::new(dec!(1.100))).unwrap(), "1.1");
        assert_eq!(perp(0).format_size(Size::new(dec!(12.9))).unwrap(), "12");

        let err = spec.format_size(Size::new(dec!(0.0004))).unwrap_err();
        assert!(matches!(err, ValidationError::Precision { decimals: 3, .. }));
    }
}
