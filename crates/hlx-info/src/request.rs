//! Request bodies for the `/info` endpoint.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleSnapshotRequest {
    pub coin: String,
    pub interval: String,
    pub start_time: u64,
    pub end_time: u64,
}

/// `oid` in an `orderStatus` query: numeric id or cloid hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OidOrCloid {
    Oid(u64),
    Cloid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum InfoRequest {
    AllMids,
    OpenOrders {
        user: String,
    },
    L2Book {
        coin: String,
    },
    CandleSnapshot {
        req: CandleSnapshotRequest,
    },
    OrderStatus {
        user: String,
        oid: OidOrCloid,
    },
    UserFills {
        user: String,
    },
    SpotMeta,
    SpotMetaAndAssetCtxs,
    SpotClearinghouseState {
        user: String,
    },
    Meta,
    MetaAndAssetCtxs,
    #[serde(rename_all = "camelCase")]
    FundingHistory {
        coin: String,
        start_time: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<u64>,
    },
    ClearinghouseState {
        user: String,
    },
}

impl InfoRequest {
    /// Value of the `type` field, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllMids => "allMids",
            Self::OpenOrders { .. } => "openOrders",
            Self::L2Book { .. } => "l2Book",
            Self::CandleSnapshot { .. } => "candleSnapshot",
            Self::OrderStatus { .. } => "orderStatus",
            Self::UserFills { .. } => "userFills",
            Self::SpotMeta => "spotMeta",
            Self::SpotMetaAndAssetCtxs => "spotMetaAndAssetCtxs",
            Self::SpotClearinghouseState { .. } => "spotClearinghouseState",
            Self::Meta => "meta",
            Self::MetaAndAssetCtxs => "metaAndAssetCtxs",
            Self::FundingHistory { .. } => "fundingHistory",
            Self::ClearinghouseState { .. } => "clearinghouseState",
        }
    }
}
