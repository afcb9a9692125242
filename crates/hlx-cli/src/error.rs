//! CLI error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] hlx_core::ValidationError),

    #[error("Key error: {0}")]
    Key(#[from] hlx_exchange::KeyError),

    #[error("Transport error: {0}")]
    Transport(#[from] hlx_transport::TransportError),

    #[error("Info error: {0}")]
    Info(#[from] hlx_info::InfoError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] hlx_exchange::ExchangeError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] hlx_telemetry::TelemetryError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
