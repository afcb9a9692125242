//! Perpetual market and account queries.

use crate::client::{check_time_range, InfoClient};
use crate::error::{InfoError, InfoResult};
use crate::normalize::{into_array, Fields};
use crate::request::InfoRequest;
use crate::types::InfoPayload;
use hlx_core::{AssetCatalog, MarketKind, MarketSpec, Symbol, ValidationError};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerpAssetInfo {
    /// `<NAME>-PERP`.
    pub symbol: String,
    pub name: String,
    /// Position in the universe, which is also the asset index.
    pub asset: u32,
    pub sz_decimals: u32,
    pub max_leverage: u32,
    pub only_isolated: bool,
    pub is_delisted: bool,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerpMeta {
    pub universe: Vec<PerpAssetInfo>,
    pub extra: Map<String, Value>,
}

impl PerpMeta {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("meta", value)?;
        let universe = f
            .take_array("universe")?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let mut a = Fields::new("perpAsset", v)?;
                let name = a.take_str("name")?;
                Ok(PerpAssetInfo {
                    symbol: Symbol::perp(name.as_str()).to_string(),
                    asset: i as u32,
                    sz_decimals: a.take_u64("szDecimals")? as u32,
                    max_leverage: a.take_u64("maxLeverage")? as u32,
                    only_isolated: a.take_bool_or("onlyIsolated", false)?,
                    is_delisted: a.take_bool_or("isDelisted", false)?,
                    name,
                    extra: a.rest(),
                })
            })
            .collect::<InfoResult<Vec<_>>>()?;
        Ok(Self {
            universe,
            extra: f.rest(),
        })
    }

    /// Add every listed perp to `catalog`. Delisted assets are skipped.
    pub fn extend_catalog(&self, catalog: &mut AssetCatalog) {
        for asset in self.universe.iter().filter(|a| !a.is_delisted) {
            catalog.insert_market(MarketSpec {
                symbol: Symbol::perp(asset.name.as_str()),
                wire_name: asset.name.clone(),
                asset: asset.asset,
                sz_decimals: asset.sz_decimals,
                max_leverage: Some(asset.max_leverage),
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerpAssetCtx {
    pub symbol: String,
    pub funding: Decimal,
    pub open_interest: Decimal,
    pub mark_price: Decimal,
    pub oracle_price: Decimal,
    pub mid_price: Option<Decimal>,
    pub premium: Option<Decimal>,
    pub prev_day_price: Decimal,
    pub day_notional_volume: Decimal,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaAndAssetCtxs {
    pub meta: PerpMeta,
    /// Same order as `meta.universe`.
    pub contexts: Vec<PerpAssetCtx>,
}

impl MetaAndAssetCtxs {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut parts = into_array("metaAndAssetCtxs", value)?.into_iter();
        let (Some(meta), Some(ctxs)) = (parts.next(), parts.next()) else {
            return Err(InfoError::decode("metaAndAssetCtxs: expected [meta, contexts]"));
        };
        let meta = PerpMeta::from_value(meta)?;
        let ctxs = into_array("assetCtxs", ctxs)?;
        if ctxs.len() != meta.universe.len() {
            return Err(InfoError::decode(format!(
                "metaAndAssetCtxs: {} contexts for {} assets",
                ctxs.len(),
                meta.universe.len()
            )));
        }

        let contexts = ctxs
            .into_iter()
            .zip(&meta.universe)
            .map(|(v, asset)| {
                let mut f = Fields::new("perpAssetCtx", v)?;
                Ok(PerpAssetCtx {
                    symbol: asset.symbol.clone(),
                    funding: f.take_decimal("funding")?,
                    open_interest: f.take_decimal("openInterest")?,
                    mark_price: f.take_decimal("markPx")?,
                    oracle_price: f.take_decimal("oraclePx")?,
                    mid_price: f.take_opt_decimal("midPx")?,
                    premium: f.take_opt_decimal("premium")?,
                    prev_day_price: f.take_decimal("prevDayPx")?,
                    day_notional_volume: f.take_decimal("dayNtlVlm")?,
                    extra: f.rest(),
                })
            })
            .collect::<InfoResult<Vec<_>>>()?;

        Ok(Self { meta, contexts })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingRecord {
    pub symbol: String,
    pub funding_rate: Decimal,
    pub premium: Decimal,
    pub time: u64,
    pub extra: Map<String, Value>,
}

impl FundingRecord {
    fn list(value: Value) -> InfoResult<Vec<Self>> {
        into_array("fundingHistory", value)?
            .into_iter()
            .map(|v| {
                let mut f = Fields::new("funding", v)?;
                Ok(Self {
                    symbol: Symbol::perp(f.take_str("coin")?).to_string(),
                    funding_rate: f.take_decimal("fundingRate")?,
                    premium: f.take_decimal("premium")?,
                    time: f.take_u64("time")?,
                    extra: f.rest(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    /// Signed size; negative is short.
    pub size: Decimal,
    pub entry_price: Option<Decimal>,
    pub position_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub liquidation_price: Option<Decimal>,
    pub margin_used: Decimal,
    pub extra: Map<String, Value>,
}

impl Position {
    fn from_value(value: Value) -> InfoResult<Self> {
        let mut outer = Fields::new("assetPosition", value)?;
        let mut f = Fields::new("position", outer.take("position")?)?;
        let mut extra = outer.rest();
        let position = Self {
            symbol: Symbol::perp(f.take_str("coin")?).to_string(),
            size: f.take_decimal("szi")?,
            entry_price: f.take_opt_decimal("entryPx")?,
            position_value: f.take_decimal("positionValue")?,
            unrealized_pnl: f.take_decimal("unrealizedPnl")?,
            liquidation_price: f.take_opt_decimal("liquidationPx")?,
            margin_used: f.take_decimal("marginUsed")?,
            extra: Map::new(),
        };
        extra.extend(f.rest());
        Ok(Self { extra, ..position })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_notional_position: Decimal,
    pub total_raw_usd: Decimal,
    pub total_margin_used: Decimal,
    pub extra: Map<String, Value>,
}

impl MarginSummary {
    fn from_value(what: &'static str, value: Value) -> InfoResult<Self> {
        let mut f = Fields::new(what, value)?;
        Ok(Self {
            account_value: f.take_decimal("accountValue")?,
            total_notional_position: f.take_decimal("totalNtlPos")?,
            total_raw_usd: f.take_decimal("totalRawUsd")?,
            total_margin_used: f.take_decimal("totalMarginUsed")?,
            extra: f.rest(),
        })
    }
}

/// Perp account state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearinghouseState {
    pub positions: Vec<Position>,
    pub margin_summary: MarginSummary,
    pub cross_margin_summary: MarginSummary,
    pub withdrawable: Decimal,
    pub time: Option<u64>,
    pub extra: Map<String, Value>,
}

impl ClearinghouseState {
    pub(crate) fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("clearinghouseState", value)?;
        let positions = f
            .take_array("assetPositions")?
            .into_iter()
            .map(Position::from_value)
            .collect::<InfoResult<Vec<_>>>()?;
        Ok(Self {
            positions,
            margin_summary: MarginSummary::from_value("marginSummary", f.take("marginSummary")?)?,
            cross_margin_summary: MarginSummary::from_value(
                "crossMarginSummary",
                f.take("crossMarginSummary")?,
            )?,
            withdrawable: f.take_decimal("withdrawable")?,
            time: f.take_opt_u64("time")?,
            extra: f.rest(),
        })
    }
}

/// Perpetual queries, borrowed from an [`InfoClient`].
pub struct PerpetualsInfo<'a> {
    client: &'a InfoClient,
}

impl<'a> PerpetualsInfo<'a> {
    pub(crate) fn new(client: &'a InfoClient) -> Self {
        Self { client }
    }

    pub(crate) async fn fetch_meta(&self) -> InfoResult<PerpMeta> {
        PerpMeta::from_value(self.client.query(&InfoRequest::Meta).await?)
    }

    pub async fn meta(&self, raw: bool) -> InfoResult<InfoPayload<PerpMeta>> {
        let value = self.client.query(&InfoRequest::Meta).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(PerpMeta::from_value(value)?))
    }

    pub async fn meta_and_asset_ctxs(
        &self,
        raw: bool,
    ) -> InfoResult<InfoPayload<MetaAndAssetCtxs>> {
        let value = self.client.query(&InfoRequest::MetaAndAssetCtxs).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(MetaAndAssetCtxs::from_value(value)?))
    }

    /// Funding rates for a perp since `start_ms`, up to `end_ms` or now.
    pub async fn funding_history(
        &self,
        symbol: &str,
        start_ms: u64,
        end_ms: Option<u64>,
        raw: bool,
    ) -> InfoResult<InfoPayload<Vec<FundingRecord>>> {
        check_time_range(start_ms, end_ms)?;
        let parsed: Symbol = symbol.parse()?;
        if parsed.kind() != MarketKind::Perp {
            return Err(ValidationError::UnknownMarket(symbol.to_string()).into());
        }

        let (coin, _) = self.client.wire_coin(symbol).await?;
        let value = self
            .client
            .query(&InfoRequest::FundingHistory {
                coin,
                start_time: start_ms,
                end_time: end_ms,
            })
            .await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(FundingRecord::list(value)?))
    }

    /// Positions and margin of `user`, or of the session account.
    pub async fn clearinghouse_state(
        &self,
        user: Option<&str>,
        raw: bool,
    ) -> InfoResult<InfoPayload<ClearinghouseState>> {
        let user = self.client.resolve_user(user)?;
        let value = self
            .client
            .query(&InfoRequest::ClearinghouseState { user })
            .await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(ClearinghouseState::from_value(
            value,
        )?))
    }
}
