//! Info gateway for the hlx exchange client.
//!
//! Unsigned, read-only queries against `/info`. Every query takes a
//! `raw` flag: raw returns the exchange JSON untouched, otherwise the
//! response is normalized into the types below.

pub mod catalog;
pub mod client;
pub mod error;
mod normalize;
pub mod perpetuals;
pub mod request;
pub mod spot;
pub mod types;

pub use catalog::build_catalog;
pub use client::{InfoClient, CANDLE_INTERVALS};
pub use error::{InfoError, InfoResult};
pub use perpetuals::{
    ClearinghouseState, FundingRecord, MarginSummary, MetaAndAssetCtxs, PerpAssetCtx,
    PerpAssetInfo, PerpMeta, PerpetualsInfo, Position,
};
pub use request::{CandleSnapshotRequest, InfoRequest, OidOrCloid};
pub use spot::{
    SpotAssetCtx, SpotBalance, SpotClearinghouseState, SpotInfo, SpotMarketInfo, SpotMeta,
    SpotMetaAndAssetCtxs, SpotTokenInfo,
};
pub use types::{AllMids, BookLevel, Candle, Fill, InfoPayload, L2Book, OpenOrder, OrderStatus};
