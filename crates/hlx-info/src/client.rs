//! Info gateway: read-only, unsigned queries against `/info`.

use crate::error::{InfoError, InfoResult};
use crate::perpetuals::PerpetualsInfo;
use crate::request::{CandleSnapshotRequest, InfoRequest, OidOrCloid};
use crate::spot::SpotInfo;
use crate::types::{AllMids, Candle, Fill, InfoPayload, L2Book, OpenOrder, OrderStatus};
use hlx_core::{
    address_to_wire, parse_address, AssetCatalog, MarketKind, OrderRef, Symbol, ValidationError,
};
use hlx_transport::{DynTransport, Endpoint, Session};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Candle intervals the exchange serves.
pub const CANDLE_INTERVALS: [&str; 14] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Read-only query client.
///
/// Metadata is fetched on demand. Hand a catalog to [`InfoClient::with_catalog`]
/// to resolve symbols without extra requests.
pub struct InfoClient {
    session: Arc<Session>,
    transport: DynTransport,
    catalog: Option<Arc<AssetCatalog>>,
}

impl InfoClient {
    pub fn new(session: Arc<Session>, transport: DynTransport) -> Self {
        Self {
            session,
            transport,
            catalog: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<AssetCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn catalog(&self) -> Option<&Arc<AssetCatalog>> {
        self.catalog.as_ref()
    }

    /// Spot market queries.
    pub fn spot(&self) -> SpotInfo<'_> {
        SpotInfo::new(self)
    }

    /// Perpetual market queries.
    pub fn perpetuals(&self) -> PerpetualsInfo<'_> {
        PerpetualsInfo::new(self)
    }

    /// POST a request and return the raw response.
    pub async fn query(&self, request: &InfoRequest) -> InfoResult<Value> {
        let body = serde_json::to_value(request)
            .map_err(|e| InfoError::decode(format!("Failed to encode request: {e}")))?;
        debug!(kind = request.kind(), "Info query");
        Ok(self.transport.post(Endpoint::Info, body).await?)
    }

    /// Mid prices for every market.
    pub async fn all_mids(&self, raw: bool) -> InfoResult<InfoPayload<AllMids>> {
        let value = self.query(&InfoRequest::AllMids).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        let catalog = self.lookup_catalog(mentions_spot_index(&value)).await?;
        Ok(InfoPayload::Normalized(AllMids::from_value(value, &catalog)?))
    }

    /// Open orders of `user`, or of the session account when `None`.
    pub async fn user_open_orders(
        &self,
        user: Option<&str>,
        raw: bool,
    ) -> InfoResult<InfoPayload<Vec<OpenOrder>>> {
        let user = self.resolve_user(user)?;
        let value = self.query(&InfoRequest::OpenOrders { user }).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        let catalog = self.lookup_catalog(mentions_spot_index(&value)).await?;
        Ok(InfoPayload::Normalized(OpenOrder::list(value, &catalog)?))
    }

    /// Order book snapshot for a symbol.
    pub async fn l2_book(&self, symbol: &str, raw: bool) -> InfoResult<InfoPayload<L2Book>> {
        let (coin, catalog) = self.wire_coin(symbol).await?;
        let value = self.query(&InfoRequest::L2Book { coin }).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(L2Book::from_value(value, &catalog)?))
    }

    /// Candles for `symbol` between `start_ms` and `end_ms`.
    pub async fn candle_snapshot(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: u64,
        end_ms: u64,
        raw: bool,
    ) -> InfoResult<InfoPayload<Vec<Candle>>> {
        if !CANDLE_INTERVALS.contains(&interval) {
            return Err(ValidationError::InvalidInterval(interval.to_string()).into());
        }
        check_time_range(start_ms, Some(end_ms))?;

        let (coin, catalog) = self.wire_coin(symbol).await?;
        let request = InfoRequest::CandleSnapshot {
            req: CandleSnapshotRequest {
                coin,
                interval: interval.to_string(),
                start_time: start_ms,
                end_time: end_ms,
            },
        };
        let value = self.query(&request).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        Ok(InfoPayload::Normalized(Candle::list(value, &catalog)?))
    }

    /// Status of one order, by oid or cloid.
    pub async fn order_status(
        &self,
        user: Option<&str>,
        order: &OrderRef,
        raw: bool,
    ) -> InfoResult<InfoPayload<OrderStatus>> {
        let user = self.resolve_user(user)?;
        let oid = match order {
            OrderRef::Oid(oid) => OidOrCloid::Oid(*oid),
            OrderRef::Cloid(cloid) => OidOrCloid::Cloid(cloid.to_wire()),
        };
        let value = self.query(&InfoRequest::OrderStatus { user, oid }).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        let catalog = self.lookup_catalog(mentions_spot_index(&value)).await?;
        Ok(InfoPayload::Normalized(OrderStatus::from_value(
            value, &catalog,
        )?))
    }

    /// Recent fills of `user`.
    pub async fn user_fills(
        &self,
        user: Option<&str>,
        raw: bool,
    ) -> InfoResult<InfoPayload<Vec<Fill>>> {
        let user = self.resolve_user(user)?;
        let value = self.query(&InfoRequest::UserFills { user }).await?;
        if raw {
            return Ok(InfoPayload::Raw(value));
        }
        let catalog = self.lookup_catalog(mentions_spot_index(&value)).await?;
        Ok(InfoPayload::Normalized(Fill::list(value, &catalog)?))
    }

    /// Explicit user, else the session's vault, else its account address.
    pub(crate) fn resolve_user(&self, user: Option<&str>) -> InfoResult<String> {
        if let Some(user) = user {
            return Ok(address_to_wire(&parse_address(user)?));
        }
        self.session
            .vault_address()
            .or_else(|| self.session.account_address())
            .map(|a| address_to_wire(&a))
            .ok_or_else(|| ValidationError::Empty("user address").into())
    }

    /// The caller's catalog, or a freshly fetched one.
    ///
    /// Without a caller catalog only spot metadata is fetched, and only
    /// when `spot_needed`; perp names need no lookup.
    pub(crate) async fn lookup_catalog(&self, spot_needed: bool) -> InfoResult<Arc<AssetCatalog>> {
        if let Some(catalog) = &self.catalog {
            return Ok(Arc::clone(catalog));
        }
        let mut catalog = AssetCatalog::new();
        if spot_needed {
            let meta = self.spot().fetch_meta().await?;
            meta.extend_catalog(&mut catalog);
        }
        Ok(Arc::new(catalog))
    }

    /// Resolve a caller symbol to the exchange coin name.
    pub(crate) async fn wire_coin(&self, symbol: &str) -> InfoResult<(String, Arc<AssetCatalog>)> {
        let parsed: Symbol = symbol.parse()?;
        if self.catalog.is_none() && parsed.kind() == MarketKind::Perp {
            return Ok((parsed.base().to_string(), self.lookup_catalog(false).await?));
        }
        let catalog = self.lookup_catalog(parsed.is_spot()).await?;
        let wire_name = catalog.resolve(symbol)?.wire_name.clone();
        Ok((wire_name, catalog))
    }
}

/// Reject `end < start` before anything is sent.
pub(crate) fn check_time_range(start_ms: u64, end_ms: Option<u64>) -> Result<(), ValidationError> {
    match end_ms {
        Some(end) if end < start_ms => Err(ValidationError::TimeRange {
            start: start_ms,
            end,
        }),
        _ => Ok(()),
    }
}

/// Whether a response names a spot market by `@N` index.
pub(crate) fn mentions_spot_index(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(k, v)| {
            k.starts_with('@')
                || (k == "coin" && v.as_str().is_some_and(|s| s.starts_with('@')))
                || mentions_spot_index(v)
        }),
        Value::Array(items) => items.iter().any(mentions_spot_index),
        _ => false,
    }
}
