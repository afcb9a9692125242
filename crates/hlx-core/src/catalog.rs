//! Asset catalog: symbol, wire name, asset index and precision.
//!
//! Built from the exchange's perp and spot metadata by `hlx-info`.
//! The catalog is a plain value owned by the caller; nothing in the
//! workspace caches one implicitly.

use crate::error::ValidationError;
use crate::market::{MarketKind, MarketSpec, Symbol};
use std::collections::HashMap;

/// A spot token as used by `spotSend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotToken {
    pub name: String,
    /// Token index in `spotMeta.tokens`.
    pub index: u32,
    /// 16-byte token id, `0x` prefixed.
    pub token_id: String,
    pub sz_decimals: u32,
}

impl SpotToken {
    /// Wire form `NAME:0xTOKENID`.
    pub fn wire(&self) -> String {
        format!("{}:{}", self.name, self.token_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    markets: HashMap<Symbol, MarketSpec>,
    by_wire_name: HashMap<String, Symbol>,
    by_asset: HashMap<u32, Symbol>,
    tokens: HashMap<String, SpotToken>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a market. Later inserts win for the same symbol.
    /// Insert or replace a market. Replacing a symbol drops the reverse
    /// entries of the spec it replaces.
    pub fn insert_market(&mut self, spec: MarketSpec) {
        if let Some(old) = self.markets.remove(&spec.symbol) {
            if self.by_wire_name.get(&old.wire_name) == Some(&old.symbol) {
                self.by_wire_name.remove(&old.wire_name);
            }
            if self.by_asset.get(&old.asset) == Some(&old.symbol) {
                self.by_asset.remove(&old.asset);
            }
        }
        self.by_wire_name
            .insert(spec.wire_name.clone(), spec.symbol.clone());
        self.by_asset.insert(spec.asset, spec.symbol.clone());
        self.markets.insert(spec.symbol.clone(), spec);
    }

    pub fn insert_token(&mut self, token: SpotToken) {
        self.tokens.insert(token.name.clone(), token);
    }

    pub fn market(&self, symbol: &Symbol) -> Option<&MarketSpec> {
        self.markets.get(symbol)
    }

    /// Parse a caller symbol and look it up.
    pub fn resolve(&self, symbol: &str) -> Result<&MarketSpec, ValidationError> {
        let parsed: Symbol = symbol.parse()?;
        self.markets
            .get(&parsed)
            .ok_or_else(|| ValidationError::UnknownMarket(symbol.to_string()))
    }

    pub fn by_wire_name(&self, wire_name: &str) -> Option<&MarketSpec> {
        self.by_wire_name
            .get(wire_name)
            .and_then(|s| self.markets.get(s))
    }

    pub fn by_asset(&self, asset: u32) -> Option<&MarketSpec> {
        self.by_asset.get(&asset).and_then(|s| self.markets.get(s))
    }

    /// Spot token by name (`"PURR"`), or by spot symbol (`"PURR-SPOT"`).
    pub fn token(&self, name: &str) -> Result<&SpotToken, ValidationError> {
        let key = match name.parse::<Symbol>() {
            Ok(symbol) if symbol.is_spot() => symbol.base().to_string(),
            _ => name.to_string(),
        };
        self.tokens
            .get(&key)
            .ok_or_else(|| ValidationError::UnknownToken(name.to_string()))
    }

    /// Caller symbol for an exchange coin name.
    ///
    /// Unknown names fall back to the exchange's naming conventions: a
    /// `BASE/QUOTE` pair or `@N` index is spot, anything else is a perp.
    pub fn symbol_for_coin(&self, coin: &str) -> Symbol {
        if let Some(symbol) = self.by_wire_name.get(coin) {
            return symbol.clone();
        }
        match coin.split_once('/') {
            Some((base, quote)) => Symbol::spot_pair(base, quote),
            None if coin.starts_with('@') => Symbol::new(coin, MarketKind::Spot),
            None => Symbol::new(coin, MarketKind::Perp),
        }
    }

    pub fn markets(&self) -> impl Iterator<Item = &MarketSpec> {
        self.markets.values()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::SPOT_ASSET_OFFSET;

    fn catalog() -> AssetCatalog {
        let mut catalog = AssetCatalog::new();
        catalog.insert_market(MarketSpec {
            symbol: Symbol::perp("BTC"),
            wire_name: "BTC".to_string(),
            asset: 0,
            sz_decimals: 5,
            max_leverage: Some(50),
        });
        catalog.insert_market(MarketSpec {
            symbol: Symbol::spot("PURR"),
            wire_name: "PURR/USDC".to_string(),
            asset: SPOT_ASSET_OFFSET,
            sz_decimals: 0,
            max_leverage: None,
        });
        catalog.insert_market(MarketSpec {
            symbol: Symbol::spot("HFUN"),
            wire_name: "@2".to_string(),
            asset: SPOT_ASSET_OFFSET + 2,
            sz_decimals: 2,
            max_leverage: None,
        });
        catalog.insert_token(SpotToken {
            name: "PURR".to_string(),
            index: 1,
            token_id: "0xc1fb593aeffbeb02f85e0308e9956a90".to_string(),
            sz_decimals: 0,
        });
        catalog
    }

    #[test]
    fn test_resolve() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("BTC-PERP").unwrap().asset, 0);
        assert_eq!(catalog.resolve("HFUN-SPOT").unwrap().asset, 10_002);
        assert_eq!(
            catalog.resolve("ETH-PERP").unwrap_err(),
            ValidationError::UnknownMarket("ETH-PERP".to_string())
        );
        assert!(matches!(
            catalog.resolve("BTC"),
            Err(ValidationError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_reverse_lookups() {
        let catalog = catalog();
        assert_eq!(catalog.by_wire_name("@2").unwrap().symbol.to_string(), "HFUN-SPOT");
        assert_eq!(catalog.by_asset(10_000).unwrap().wire_name, "PURR/USDC");
        assert!(catalog.by_asset(7).is_none());
    }

    #[test]
    fn test_symbol_for_coin() {
        let catalog = catalog();
        assert_eq!(catalog.symbol_for_coin("BTC").to_string(), "BTC-PERP");
        assert_eq!(catalog.symbol_for_coin("@2").to_string(), "HFUN-SPOT");
        assert_eq!(catalog.symbol_for_coin("PURR/USDC").to_string(), "PURR-SPOT");
        assert_eq!(catalog.symbol_for_coin("ETH").to_string(), "ETH-PERP");
        assert_eq!(catalog.symbol_for_coin("@99").to_string(), "@99-SPOT");
        assert_eq!(catalog.symbol_for_coin("HYPE/USDH").to_string(), "HYPE/USDH-SPOT");
    }

    #[test]
    fn test_replaced_market_drops_stale_lookups() {
        let mut catalog = catalog();
        catalog.insert_market(MarketSpec {
            symbol: Symbol::spot("HFUN"),
            wire_name: "@7".to_string(),
            asset: SPOT_ASSET_OFFSET + 7,
            sz_decimals: 2,
            max_leverage: None,
        });
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.resolve("HFUN-SPOT").unwrap().wire_name, "@7");
        assert!(catalog.by_wire_name("@2").is_none());
        assert!(catalog.by_asset(SPOT_ASSET_OFFSET + 2).is_none());
        assert_eq!(catalog.symbol_for_coin("@2").to_string(), "@2-SPOT");
    }

    #[test]
    fn test_token_lookup() {
        let catalog = catalog();
        let token = catalog.token("PURR-SPOT").unwrap();
        assert_eq!(token.wire(), "PURR:0xc1fb593aeffbeb02f85e0308e9956a90");
        assert_eq!(catalog.token("PURR").unwrap().index, 1);
        assert!(matches!(
            catalog.token("NOPE"),
            Err(ValidationError::UnknownToken(_))
        ));
    }
}
