//! Core domain types for the hlx exchange client.
//!
//! - `Price`, `Size`: precision-safe numeric types
//! - `Symbol`, `MarketSpec`, `AssetCatalog`: market addressing and tick rules
//! - `OrderRequest`, `Cloid`: caller-side order description
//! - `OrderState`: local order lifecycle

pub mod address;
pub mod catalog;
pub mod decimal;
pub mod error;
pub mod lifecycle;
pub mod market;
pub mod order;

pub use address::{address_to_wire, parse_address};
pub use catalog::{AssetCatalog, SpotToken};
pub use decimal::{to_micro_usd, wire_string, Price, Size};
pub use error::{CoreError, Result, ValidationError};
pub use lifecycle::{OrderEvent, OrderState};
pub use market::{MarketKind, MarketSpec, Symbol, SPOT_ASSET_OFFSET, USDC_QUOTE};
pub use order::{Cloid, Oid, OrderKind, OrderRef, OrderRequest, OrderSide, TimeInForce, Tpsl};
