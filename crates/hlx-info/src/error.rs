//! Info gateway error types.

use hlx_core::ValidationError;
use hlx_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfoError {
    /// Rejected locally; no request was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl InfoError {
    /// Response body did not have the expected shape.
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Transport(TransportError::Decode(message.into()))
    }
}

pub type InfoResult<T> = Result<T, InfoError>;
