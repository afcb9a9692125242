//! Transport error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connectivity failure. `request_sent` tells whether the request may
    /// have reached the exchange before the failure.
    #[error("Network error: {message}")]
    Network { message: String, request_sent: bool },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the exchange may have received and acted on the request.
    pub fn may_have_reached_exchange(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Network { request_sent, .. } => *request_sent,
            Self::Http { .. } | Self::Decode(_) => false,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_have_reached_exchange() {
        assert!(TransportError::Timeout.may_have_reached_exchange());
        assert!(TransportError::Network {
            message: "reset".into(),
            request_sent: true
        }
        .may_have_reached_exchange());
        assert!(!TransportError::Network {
            message: "refused".into(),
            request_sent: false
        }
        .may_have_reached_exchange());
        assert!(!TransportError::Http {
            status: 500,
            body: String::new()
        }
        .may_have_reached_exchange());
    }
}
