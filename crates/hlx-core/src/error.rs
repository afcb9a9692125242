//! Error types for hlx-core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Caller input rejected before anything is sent to the exchange.
///
/// Always locally recoverable: a `ValidationError` guarantees that no
/// request left the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("{field} must be non-zero")]
    Zero { field: &'static str },

    #[error("{field} {value} is not representable with {decimals} decimals")]
    Precision {
        field: &'static str,
        value: Decimal,
        decimals: u32,
    },

    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: Decimal },

    #[error("Invalid market symbol: {0}")]
    InvalidSymbol(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Unknown spot token: {0}")]
    UnknownToken(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid candle interval: {0}")]
    InvalidInterval(String),

    #[error("End time {end} precedes start time {start}")]
    TimeRange { start: u64, end: u64 },

    #[error("Time {time} is not in the future (now {now})")]
    NotInFuture { time: u64, now: u64 },

    #[error("Leverage {leverage} outside 1..={max}")]
    Leverage { leverage: u32, max: u32 },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0}")]
    Other(String),
}

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Illegal order transition: {from} on {event}")]
    IllegalTransition { from: String, event: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
