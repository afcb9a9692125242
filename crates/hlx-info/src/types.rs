//! Normalized info response types.
//!
//! Coin names are converted to caller symbols (`"BTC"` becomes
//! `"BTC-PERP"`, `"@107"` becomes `"HYPE-SPOT"`), and decimal strings are
//! parsed. Each struct keeps the fields it does not model in `extra`.

use crate::error::InfoResult;
use crate::normalize::{into_array, Fields};
use hlx_core::{AssetCatalog, OrderSide, OrderState};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Either the exchange's JSON untouched or the normalized form.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoPayload<T> {
    Raw(Value),
    Normalized(T),
}

impl<T> InfoPayload<T> {
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    pub fn raw(self) -> Option<Value> {
        match self {
            Self::Raw(v) => Some(v),
            Self::Normalized(_) => None,
        }
    }

    pub fn normalized(self) -> Option<T> {
        match self {
            Self::Raw(_) => None,
            Self::Normalized(t) => Some(t),
        }
    }
}

impl<T: Serialize> InfoPayload<T> {
    /// JSON view of either form.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Self::Raw(v) => Ok(v.clone()),
            Self::Normalized(t) => serde_json::to_value(t),
        }
    }
}

fn side_from_wire(side: &str) -> Option<OrderSide> {
    match side {
        "B" => Some(OrderSide::Buy),
        "A" => Some(OrderSide::Sell),
        _ => None,
    }
}

fn take_side(fields: &mut Fields) -> InfoResult<OrderSide> {
    let side = fields.take_str("side")?;
    side_from_wire(&side)
        .ok_or_else(|| crate::error::InfoError::decode(format!("unknown side `{side}`")))
}

/// Mid prices keyed by symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllMids {
    pub mids: BTreeMap<String, Decimal>,
    /// Entries whose value is not a decimal.
    pub extra: Map<String, Value>,
}

impl AllMids {
    pub(crate) fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let fields = Fields::new("allMids", value)?;
        let mut mids = BTreeMap::new();
        let mut extra = Map::new();
        for (coin, px) in fields.rest() {
            match crate::normalize::parse_decimal(&px) {
                Some(mid) => {
                    mids.insert(catalog.symbol_for_coin(&coin).to_string(), mid);
                }
                None => {
                    extra.insert(coin, px);
                }
            }
        }
        Ok(Self { mids, extra })
    }
}

/// A resting order as reported by `openOrders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub limit_price: Decimal,
    pub size: Decimal,
    pub oid: u64,
    pub timestamp: u64,
    pub cloid: Option<String>,
    pub extra: Map<String, Value>,
}

impl OpenOrder {
    pub(crate) fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let mut f = Fields::new("openOrder", value)?;
        Ok(Self {
            symbol: catalog.symbol_for_coin(&f.take_str("coin")?).to_string(),
            side: take_side(&mut f)?,
            limit_price: f.take_decimal("limitPx")?,
            size: f.take_decimal("sz")?,
            oid: f.take_u64("oid")?,
            timestamp: f.take_u64("timestamp")?,
            cloid: f.take_opt_str("cloid")?,
            extra: f.rest(),
        })
    }

    pub(crate) fn list(value: Value, catalog: &AssetCatalog) -> InfoResult<Vec<Self>> {
        into_array("openOrders", value)?
            .into_iter()
            .map(|v| Self::from_value(v, catalog))
            .collect()
    }
}

/// One price level of an order book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub num_orders: u64,
    pub extra: Map<String, Value>,
}

impl BookLevel {
    fn from_value(value: Value) -> InfoResult<Self> {
        let mut f = Fields::new("level", value)?;
        Ok(Self {
            price: f.take_decimal("px")?,
            size: f.take_decimal("sz")?,
            num_orders: f.take_u64("n")?,
            extra: f.rest(),
        })
    }
}

/// Order book snapshot. Both sides run best to worst.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L2Book {
    pub symbol: String,
    pub time: u64,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub extra: Map<String, Value>,
}

impl L2Book {
    pub(crate) fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let mut f = Fields::new("l2Book", value)?;
        let symbol = catalog.symbol_for_coin(&f.take_str("coin")?).to_string();
        let time = f.take_u64("time")?;
        let mut levels = f.take_array("levels")?.into_iter();

        let mut side = |name: &'static str| -> InfoResult<Vec<BookLevel>> {
            match levels.next() {
                Some(v) => into_array(name, v)?
                    .into_iter()
                    .map(BookLevel::from_value)
                    .collect(),
                None => Ok(Vec::new()),
            }
        };
        // The exchange lists bids first, then asks.
        let bids = side("bids")?;
        let asks = side("asks")?;

        Ok(Self {
            symbol,
            time,
            bids,
            asks,
            extra: f.rest(),
        })
    }
}

/// OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: u64,
    pub close_time: u64,
    pub symbol: String,
    pub interval: String,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    pub trades: u64,
    pub extra: Map<String, Value>,
}

impl Candle {
    fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let mut f = Fields::new("candle", value)?;
        Ok(Self {
            open_time: f.take_u64("t")?,
            close_time: f.take_u64("T")?,
            symbol: catalog.symbol_for_coin(&f.take_str("s")?).to_string(),
            interval: f.take_str("i")?,
            open: f.take_decimal("o")?,
            close: f.take_decimal("c")?,
            high: f.take_decimal("h")?,
            low: f.take_decimal("l")?,
            volume: f.take_decimal("v")?,
            trades: f.take_u64("n")?,
            extra: f.rest(),
        })
    }

    pub(crate) fn list(value: Value, catalog: &AssetCatalog) -> InfoResult<Vec<Self>> {
        into_array("candleSnapshot", value)?
            .into_iter()
            .map(|v| Self::from_value(v, catalog))
            .collect()
    }
}

/// Result of an `orderStatus` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatus {
    /// Exchange status string (`"open"`, `"filled"`, `"canceled"`, ...),
    /// or the top-level status (`"unknownOid"`) when the order is unknown.
    pub status: String,
    /// Local lifecycle state, when the status maps to one.
    pub state: Option<OrderState>,
    pub order: Option<OpenOrder>,
    pub status_timestamp: Option<u64>,
    /// Unrecognized keys of the response itself.
    pub extra: Map<String, Value>,
    /// Unrecognized keys of the `order` wrapper, next to `status`.
    pub order_extra: Map<String, Value>,
}

impl OrderStatus {
    pub fn is_known(&self) -> bool {
        self.order.is_some()
    }

    pub(crate) fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let mut f = Fields::new("orderStatus", value)?;
        let top_status = f.take_str("status")?;

        let Some(wrapper) = f.take_opt("order") else {
            return Ok(Self {
                state: OrderState::from_exchange_status(&top_status),
                status: top_status,
                order: None,
                status_timestamp: None,
                extra: f.rest(),
                order_extra: Map::new(),
            });
        };

        let mut w = Fields::new("orderStatus.order", wrapper)?;
        let status = w.take_str("status")?;
        let order = OpenOrder::from_value(w.take("order")?, catalog)?;
        let status_timestamp = w.take_opt_u64("statusTimestamp")?;

        Ok(Self {
            state: OrderState::from_exchange_status(&status),
            status,
            order: Some(order),
            status_timestamp,
            extra: f.rest(),
            order_extra: w.rest(),
        })
    }
}

/// A user fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub time: u64,
    pub oid: u64,
    pub fee: Option<Decimal>,
    pub closed_pnl: Option<Decimal>,
    pub extra: Map<String, Value>,
}

impl Fill {
    fn from_value(value: Value, catalog: &AssetCatalog) -> InfoResult<Self> {
        let mut f = Fields::new("fill", value)?;
        Ok(Self {
            symbol: catalog.symbol_for_coin(&f.take_str("coin")?).to_string(),
            side: take_side(&mut f)?,
            price: f.take_decimal("px")?,
            size: f.take_decimal("sz")?,
            time: f.take_u64("time")?,
            oid: f.take_u64("oid")?,
            fee: f.take_opt_decimal("fee")?,
            closed_pnl: f.take_opt_decimal("closedPnl")?,
            extra: f.rest(),
        })
    }

    pub(crate) fn list(value: Value, catalog: &AssetCatalog) -> InfoResult<Vec<Self>> {
        into_array("userFills", value)?
            .into_iter()
            .map(|v| Self::from_value(v, catalog))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlx_core::{MarketSpec, Symbol, SPOT_ASSET_OFFSET};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn catalog() -> AssetCatalog {
        let mut c = AssetCatalog::new();
        c.insert_market(MarketSpec {
            symbol: Symbol::spot("HFUN"),
            wire_name: "@2".into(),
            asset: SPOT_ASSET_OFFSET + 2,
            sz_decimals: 2,
            max_leverage: None,
        });
        c
    }

    #[test]
    fn test_all_mids() {
        let mids = AllMids::from_value(
            json!({"BTC": "30000.5", "@2": "12.1", "PURR/USDC": "0.2"}),
            &catalog(),
        )
        .unwrap();
        assert_eq!(mids.mids["BTC-PERP"], dec!(30000.5));
        assert_eq!(mids.mids["HFUN-SPOT"], dec!(12.1));
        assert_eq!(mids.mids["PURR-SPOT"], dec!(0.2));
        assert!(mids.extra.is_empty());
    }

    #[test]
    fn test_l2_book_sides() {
        let raw = json!({
            "coin": "BTC",
            "time": 1700000000000u64,
            "levels": [
                [{"px": "100", "sz": "1", "n": 1}, {"px": "99", "sz": "2", "n": 3}],
                [{"px": "101", "sz": "1.5", "n": 2}]
            ]
        });
        let book = L2Book::from_value(raw, &AssetCatalog::new()).unwrap();
        assert_eq!(book.symbol, "BTC-PERP");
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.bids[0].price, dec!(100));
        assert_eq!(book.bids[1].num_orders, 3);
        assert_eq!(book.asks[0].price, dec!(101));
    }

    #[test]
    fn test_order_status_unknown() {
        let status =
            OrderStatus::from_value(json!({"status": "unknownOid"}), &AssetCatalog::new())
                .unwrap();
        assert!(!status.is_known());
        assert_eq!(status.state, None);
    }

    #[test]
    fn test_order_status_known() {
        let raw = json!({
            "status": "order",
            "order": {
                "order": {
                    "coin": "@2", "side": "A", "limitPx": "13", "sz": "5",
                    "oid": 42, "timestamp": 1, "cloid": "0x00000000000000000000000000000001",
                    "origSz": "5"
                },
                "status": "canceled",
                "statusTimestamp": 2
            }
        });
        let status = OrderStatus::from_value(raw, &catalog()).unwrap();
        assert_eq!(status.state, Some(OrderState::Cancelled));
        let order = status.order.unwrap();
        assert_eq!(order.symbol, "HFUN-SPOT");
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.extra["origSz"], json!("5"));
        assert_eq!(status.status_timestamp, Some(2));
    }

    #[test]
    fn test_order_status_keeps_wrapper_keys_apart() {
        let raw = json!({
            "status": "order",
            "source": "api",
            "order": {
                "order": {"coin": "BTC", "side": "B", "limitPx": "1", "sz": "1",
                          "oid": 7, "timestamp": 1},
                "status": "open",
                "source": "book"
            }
        });
        let status = OrderStatus::from_value(raw, &AssetCatalog::new()).unwrap();
        assert_eq!(status.status, "open");
        assert_eq!(status.extra["source"], json!("api"));
        assert_eq!(status.order_extra["source"], json!("book"));
        assert_eq!(status.extra.len(), 1);
    }

    #[test]
    fn test_payload_accessors() {
        let raw: InfoPayload<AllMids> = InfoPayload::Raw(json!({"BTC": "1"}));
        assert!(raw.is_raw());
        assert_eq!(raw.to_json().unwrap(), json!({"BTC": "1"}));
        assert!(raw.normalized().is_none());
    }
}
