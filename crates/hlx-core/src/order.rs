//! Order requests and order identifiers.
//!
//! `OrderRequest` is the caller-facing description of a new order. The
//! exchange wire form is produced later by the encoder, which needs the
//! market's precision to do so.

use crate::decimal::{Price, Size};
use crate::error::ValidationError;
use alloy::primitives::keccak256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Exchange-assigned order id.
pub type Oid = u64;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "b" | "bid" => Ok(Self::Buy),
            "sell" | "s" | "ask" => Ok(Self::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[default]
    #[serde(rename = "Gtc")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "Ioc")]
    ImmediateOrCancel,
    /// Add-liquidity-only (post only).
    #[serde(rename = "Alo")]
    AddLiquidityOnly,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilCancelled => write!(f, "Gtc"),
            Self::ImmediateOrCancel => write!(f, "Ioc"),
            Self::AddLiquidityOnly => write!(f, "Alo"),
        }
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gtc" => Ok(Self::GoodTilCancelled),
            "ioc" => Ok(Self::ImmediateOrCancel),
            "alo" => Ok(Self::AddLiquidityOnly),
            other => Err(format!("unknown time-in-force: {other}")),
        }
    }
}

/// Take-profit or stop-loss flavour of a trigger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tpsl {
    Tp,
    Sl,
}

/// Order type: resting limit or trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Limit {
        tif: TimeInForce,
    },
    Trigger {
        trigger_price: Price,
        is_market: bool,
        tpsl: Tpsl,
    },
}

impl Default for OrderKind {
    fn default() -> Self {
        Self::Limit {
            tif: TimeInForce::default(),
        }
    }
}

/// Caller-assigned order correlation token.
///
/// The caller may pick any non-empty string. On the wire the exchange
/// wants a 128-bit hex token; see [`Cloid::to_wire`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cloid(String);

impl Cloid {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Like [`Cloid::new`], but rejects a blank token.
    pub fn parse(token: impl Into<String>) -> Result<Self, ValidationError> {
        let cloid = Self(token.into());
        cloid.validate()?;
        Ok(cloid)
    }

    /// A blank token cannot correlate anything.
    pub fn validate(&self) -> Result<&Self, ValidationError> {
        if self.0.trim().is_empty() {
            return Err(ValidationError::Empty("cloid"));
        }
        Ok(self)
    }

    /// Fresh random 128-bit token, already in wire form.
    pub fn random() -> Self {
        Self(format!("0x{}", hex::encode(Uuid::new_v4().as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire token: `0x` followed by 32 hex characters.
    ///
    /// Tokens already in that form pass through unchanged. Anything else
    /// maps to the first 16 bytes of its keccak256 digest, so the same
    /// caller token always yields the same wire token.
    pub fn to_wire(&self) -> String {
        if is_wire_cloid(&self.0) {
            return self.0.clone();
        }
        let digest = keccak256(self.0.as_bytes());
        format!("0x{}", hex::encode(&digest[..16]))
    }
}

fn is_wire_cloid(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|body| body.len() == 32 && body.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

impl fmt::Display for Cloid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cloid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for Cloid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Cloid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to an existing order, by exchange id or by cloid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderRef {
    Oid(Oid),
    Cloid(Cloid),
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oid(oid) => write!(f, "oid:{oid}"),
            Self::Cloid(cloid) => write!(f, "cloid:{cloid}"),
        }
    }
}

impl From<Oid> for OrderRef {
    fn from(oid: Oid) -> Self {
        Self::Oid(oid)
    }
}

impl From<Cloid> for OrderRef {
    fn from(cloid: Cloid) -> Self {
        Self::Cloid(cloid)
    }
}

/// A new order as the caller describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Market symbol, e.g. `"BTC-PERP"` or `"PURR-SPOT"`.
    pub coin: String,
    pub is_buy: bool,
    pub size: Size,
    pub limit_price: Price,
    pub order_type: OrderKind,
    pub reduce_only: bool,
    pub cloid: Option<Cloid>,
}

impl OrderRequest {
    /// Limit order with the given time-in-force.
    pub fn limit(
        coin: impl Into<String>,
        side: OrderSide,
        size: Size,
        limit_price: Price,
        tif: TimeInForce,
    ) -> Self {
        Self {
            coin: coin.into(),
            is_buy: side.is_buy(),
            size,
            limit_price,
            order_type: OrderKind::Limit { tif },
            reduce_only: false,
            cloid: None,
        }
    }

    /// Trigger (take-profit / stop-loss) order.
    pub fn trigger(
        coin: impl Into<String>,
        side: OrderSide,
        size: Size,
        limit_price: Price,
        trigger_price: Price,
        is_market: bool,
        tpsl: Tpsl,
    ) -> Self {
        Self {
            coin: coin.into(),
            is_buy: side.is_buy(),
            size,
            limit_price,
            order_type: OrderKind::Trigger {
                trigger_price,
                is_market,
                tpsl,
            },
            reduce_only: false,
            cloid: None,
        }
    }

    pub fn with_cloid(mut self, cloid: impl Into<Cloid>) -> Self {
        self.cloid = Some(cloid.into());
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }
}
