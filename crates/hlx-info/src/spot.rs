//! Spot market queries and types.

use crate::client::InfoClient;
use crate::error::{InfoError, InfoResult};
use crate::normalize::{into_array, Fields};
use crate::request::InfoRequest;
use crate::types::InfoPayload;
use hlx_core::{AssetCatalog, MarketSpec, SpotToken, Symbol, SPOT_ASSET_OFFSET};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotTokenInfo {
    pub name: String,
    pub index: u32,
    pub token_id: String,
    pub sz_decimals: u32,
    pub wei_decimals: Option<u32>,
    pub is_canonical: bool,
    pub extra: Map<String, Value>,
}

impl SpotTokenInfo {
    fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("spotToken", value)?;
        Ok(Self {
            name: f.take_str("name")?,
            index: f.take_u64("index")? as u32,
            token_id: f.take_str("tokenId")?,
            sz_decimals: f.take_u64("szDecimals")? as u32,
            wei_decimals: f.take_opt_u64("weiDecimals")?.map(|d| d as u32),
            is_canonical: f.take_bool_or("isCanonical", false)?,
            extra: f.rest(),
        })
    }
}

/// A spot trading pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotMarketInfo {
    /// `<BASE>-SPOT` for USDC pairs, `<BASE>/<QUOTE>-SPOT` otherwise.
    /// A pair whose symbol is already taken falls back to its wire name.
    pub symbol: String,
    /// Exchange pair name (`"PURR/USDC"` or `"@N"`).
    pub wire_name: String,
    pub index: u32,
    pub base_token: u32,
    pub quote_token: u32,
    pub is_canonical: bool,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotMeta {
    pub tokens: Vec<SpotTokenInfo>,
    pub markets: Vec<SpotMarketInfo>,
    pub extra: Map<String, Value>,
}

impl SpotMeta {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("spotMeta", value)?;
        let tokens = f
            .take_array("tokens")?
            .into_iter()
            .map(SpotTokenInfo::from_value)
            .collect::<InfoResult<Vec<_>>>()?;

        let names: HashMap<u32, &str> = tokens.iter().map(|t| (t.index, t.name.as_str())).collect();
        let mut taken = HashSet::new();

        let markets = f
            .take_array("universe")?
            .into_iter()
            .map(|v| {
                let mut m = Fields::new("spotMarket", v)?;
                let pair = m.take_array("tokens")?;
                let (base, quote) = match pair.as_slice() {
                    [b, q] => (
                        b.as_u64().ok_or_else(|| InfoError::decode("spot pair token index"))? as u32,
                        q.as_u64().ok_or_else(|| InfoError::decode("spot pair token index"))? as u32,
                    ),
                    _ => return Err(InfoError::decode("spot pair must list two tokens")),
                };
                let wire_name = m.take_str("name")?;
                let mut symbol = match (names.get(&base), names.get(&quote)) {
                    (Some(b), Some(q)) => Symbol::spot_pair(b, q),
                    _ => Symbol::spot(wire_name.as_str()),
                };
                if !taken.insert(symbol.clone()) {
                    symbol = Symbol::spot(wire_name.as_str());
                }
                Ok(SpotMarketInfo {
                    symbol: symbol.to_string(),
                    wire_name,
                    index: m.take_u64("index")? as u32,
                    base_token: base,
                    quote_token: quote,
                    is_canonical: m.take_bool_or("isCanonical", false)?,
                    extra: m.rest(),
                })
            })
            .collect::<InfoResult<Vec<_>>>()?;

        Ok(Self {
            tokens,
            markets,
            extra: f.rest(),
        })
    }

    /// Add every spot pair and token to `catalog`.
    pub fn extend_catalog(&self, catalog: &mut AssetCatalog) {
        let sz_decimals: HashMap<u32, u32> =
            self.tokens.iter().map(|t| (t.index, t.sz_decimals)).collect();

        for token in &self.tokens {
            catalog.insert_token(SpotToken {
                name: token.name.clone(),
                index: token.index,
                token_id: token.token_id.clone(),
                sz_decimals: token.sz_decimals,
            });
        }

        for market in &self.markets {
            let Ok(symbol) = market.symbol.parse::<Symbol>() else {
                continue;
            };
            catalog.insert_market(MarketSpec {
                symbol,
                wire_name: market.wire_name.clone(),
                asset: SPOT_ASSET_OFFSET + market.index,
                sz_decimals: sz_decimals.get(&market.base_token).copied().unwrap_or(0),
                max_leverage: None,
            });
        }
    }

    pub fn to_catalog(&self) -> AssetCatalog {
        let mut catalog = AssetCatalog::new();
        self.extend_catalog(&mut catalog);
        catalog
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotAssetCtx {
    pub symbol: String,
    pub mark_price: Decimal,
    pub mid_price: Option<Decimal>,
    pub prev_day_price: Decimal,
    pub day_notional_volume: Decimal,
    pub circulating_supply: Option<Decimal>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotMetaAndAssetCtxs {
    pub meta: SpotMeta,
    pub contexts: Vec<SpotAssetCtx>,
}

impl SpotMetaAndAssetCtxs {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut parts = into_array("spotMetaAndAssetCtxs", value)?.into_iter();
        let (Some(meta), Some(ctxs)) = (parts.next(), parts.next()) else {
            return Err(InfoError::decode("spotMetaAndAssetCtxs: expected [meta, contexts]"));
        };
        let meta = SpotMeta::from_value(meta)?;
        let catalog = meta.to_catalog();

        let contexts = into_array("spotAssetCtxs", ctxs)?
            .into_iter()
            .map(|v| {
                let mut f = Fields::new("spotAssetCtx", v)?;
                Ok(SpotAssetCtx {
                    symbol: catalog.symbol_for_coin(&f.take_str("coin")?).to_string(),
                    mark_price: f.take_decimal("markPx")?,
                    mid_price: f.take_opt_decimal("midPx")?,
                    prev_day_price: f.take_decimal("prevDayPx")?,
                    day_notional_volume: f.take_decimal("dayNtlVlm")?,
                    circulating_supply: f.take_opt_decimal("circulatingSupply")?,
                    extra: f.rest(),
                })
            })
            .collect::<InfoResult<Vec<_>>>()?;

        Ok(Self { meta, contexts })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotBalance {
    /// Token name.
    pub coin: String,
    pub token: u32,
    pub total: Decimal,
    pub hold: Decimal,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotClearinghouseState {
    pub balances: Vec<SpotBalance>,
    pub extra: Map<String, Value>,
}

impl SpotClearinghouseState {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("spotClearinghouseState", value)?;
        let balances = f
            .take_array("balances")?
            .into_iter()
            .map(|v| {
                let mut b = Fields::new("spotBalance", v)?;
                Ok(SpotBalance {
                    coin: b.take_str("coin")?,
                    token: b.take_u64("token")? as u32,
                    total: b.take_decimal("total")?,
                    hold: b.take_decimal("hold")?,
                    extra: b.rest(),
                })
            })
            .collect::<InfoResult<Vec<_>>>()?;
        Ok(Self {
            balances,
            extra: f.rest(),
        })
    }
}

/// Spot queries, borrowed from an [`InfoClient`].
pub struct SpotInfo<'a> {
    client: &'a InfoClient,
}

impl<'a> SpotInfo<'a> {
    pub(crate) fn new(client: &'a InfoClient) -> Self {
        Self { client }
    }

    pub(crate) async fn fetch_meta(&self) -> InfoResult<SpotMeta> {
        SpotMeta::from_value(self.client.query(&InfoRequest::SpotMeta).await?)
    }

    pub async fn spot_meta(&self, raw: bool) -> InfoResult<InfoPayload<SpotMeta>> {
        let value = self.client.query(&InfoRequest::SpotMeta).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(SpotMeta::from_value(value)?))
    }

    pub async fn spot_meta_and_asset_ctxs(
        &self,
        raw: bool,
    ) -> InfoResult<InfoPayload<SpotMetaAndAssetCtxs>> {
        let value = self.client.query(&InfoRequest::SpotMetaAndAssetCtxs).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(SpotMetaAndAssetCtxs::from_value(
            value,
        )?))
    }

    /// Token balances of `user`, or of the session account.
    pub async fn spot_clearinghouse_state(
        &self,
        user: Option<&str>,
        raw: bool,
    ) -> InfoResult<InfoPayload<SpotClearinghouseState>> {
        let user = self.client.resolve_user(user)?;
        let value = self
            .client
            .query(&InfoRequest::SpotClearinghouseState { user })
            .await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(SpotClearinghouseState::from_value(
            value,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn spot_meta_json() -> Value {
        json!({
            "tokens": [
                {"name": "USDC", "szDecimals": 8, "weiDecimals": 8, "index": 0,
                 "tokenId": "0x6d1e7cde53ba9467b783cb7c530ce054", "isCanonical": true},
                {"name": "PURR", "szDecimals": 0, "weiDecimals": 5, "index": 1,
                 "tokenId": "0xc1fb593aeffbeb02f85e0308e9956a90", "isCanonical": true},
                {"name": "HFUN", "szDecimals": 2, "weiDecimals": 8, "index": 2,
                 "tokenId": "0xbaf265ef389da684513d98d68edf4eae", "isCanonical": false,
                 "evmContract": null}
            ],
            "universe": [
                {"tokens": [1, 0], "name": "PURR/USDC", "index": 0, "isCanonical": true},
                {"tokens": [2, 0], "name": "@1", "index": 1, "isCanonical": false}
            ]
        })
    }

    #[test]
    fn test_spot_meta_normalization() {
        let meta = SpotMeta::from_value(spot_meta_json()).unwrap();
        assert_eq!(meta.tokens.len(), 3);
        assert_eq!(meta.markets[0].symbol, "PURR-SPOT");
        assert_eq!(meta.markets[1].symbol, "HFUN-SPOT");
        assert_eq!(meta.markets[1].wire_name, "@1");
        assert!(meta.tokens[2].extra.contains_key("evmContract"));
    }

    #[test]
    fn test_spot_catalog() {
        let catalog = SpotMeta::from_value(spot_meta_json()).unwrap().to_catalog();
        let hfun = catalog.resolve("HFUN-SPOT").unwrap();
        assert_eq!(hfun.asset, 10_001);
        assert_eq!(hfun.sz_decimals, 2);
        assert_eq!(hfun.wire_name, "@1");
        assert_eq!(
            catalog.token("PURR").unwrap().wire(),
            "PURR:0xc1fb593aeffbeb02f85e0308e9956a90"
        );
    }

    #[test]
    fn test_pairs_sharing_a_base_keep_their_own_symbols() {
        let meta = SpotMeta::from_value(json!({
            "tokens": [
                {"name": "USDC", "szDecimals": 8, "index": 0, "tokenId": "0x00"},
                {"name": "HYPE", "szDecimals": 2, "index": 1, "tokenId": "0x01"},
                {"name": "USDH", "szDecimals": 2, "index": 2, "tokenId": "0x02"}
            ],
            "universe": [
                {"tokens": [1, 2], "name": "@1", "index": 1},
                {"tokens": [1, 0], "name": "@2", "index": 2},
                {"tokens": [1, 0], "name": "@3", "index": 3}
            ]
        }))
        .unwrap();
        let symbols: Vec<_> = meta.markets.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, ["HYPE/USDH-SPOT", "HYPE-SPOT", "@3-SPOT"]);

        let catalog = meta.to_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.symbol_for_coin("@1").to_string(), "HYPE/USDH-SPOT");
        assert_eq!(catalog.symbol_for_coin("@2").to_string(), "HYPE-SPOT");
        assert_eq!(catalog.resolve("HYPE/USDH-SPOT").unwrap().asset, 10_001);
    }

    #[test]
    fn test_spot_meta_and_ctxs() {
        let raw = json!([
            spot_meta_json(),
            [
                {"coin": "PURR/USDC", "markPx": "0.2", "midPx": "0.201", "prevDayPx": "0.19",
                 "dayNtlVlm": "1000", "circulatingSupply": "500"},
                {"coin": "@1", "markPx": "12", "midPx": null, "prevDayPx": "11",
                 "dayNtlVlm": "0", "totalSupply": "9"}
            ]
        ]);
        let both = SpotMetaAndAssetCtxs::from_value(raw).unwrap();
        assert_eq!(both.contexts[0].symbol, "PURR-SPOT");
        assert_eq!(both.contexts[0].mid_price, Some(dec!(0.201)));
        assert_eq!(both.contexts[1].symbol, "HFUN-SPOT");
        assert_eq!(both.contexts[1].mid_price, None);
        assert_eq!(both.contexts[1].extra["totalSupply"], json!("9"));
    }

    #[test]
    fn test_spot_clearinghouse_state() {
        let state = SpotClearinghouseState::from_value(json!({
            "balances": [
                {"coin": "USDC", "token": 0, "total": "100.5", "hold": "0", "entryNtl": "0"}
            ]
        }))
        .unwrap();
        assert_eq!(state.balances[0].total, dec!(100.5));
        assert_eq!(state.balances[0].extra["entryNtl"], json!("0"));
    }
}
