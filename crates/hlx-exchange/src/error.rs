//! Exchange gateway error types.

use crate::signer::SignerError;
use hlx_core::ValidationError;
use hlx_info::InfoError;
use hlx_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Rejected locally; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The exchange answered `status: err`.
    #[error("Rejected by exchange: {0}")]
    Rejected(String),

    /// The order was never placed, is already cancelled, or has filled.
    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

/// Whether a failed call may still have taken effect on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NothingHappened,
    MayHaveHappened,
}

impl ExchangeError {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Transport(e) if e.may_have_reached_exchange() => Outcome::MayHaveHappened,
            _ => Outcome::NothingHappened,
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Transport(TransportError::Decode(message.into()))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Signing(_) => "signing",
            Self::Transport(TransportError::Timeout) => "timeout",
            Self::Transport(_) => "transport",
            Self::Rejected(_) => "rejected",
            Self::OrderNotFound(_) => "not_found",
        }
    }
}

impl From<InfoError> for ExchangeError {
    fn from(e: InfoError) -> Self {
        match e {
            InfoError::Validation(v) => Self::Validation(v),
            InfoError::Transport(t) => Self::Transport(t),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_split() {
        assert_eq!(
            ExchangeError::Transport(TransportError::Timeout).outcome(),
            Outcome::MayHaveHappened
        );
        assert_eq!(
            ExchangeError::Transport(TransportError::Network {
                message: "reset".into(),
                request_sent: true,
            })
            .outcome(),
            Outcome::MayHaveHappened
        );
        assert_eq!(
            ExchangeError::Transport(TransportError::Network {
                message: "refused".into(),
                request_sent: false,
            })
            .outcome(),
            Outcome::NothingHappened
        );
        assert_eq!(
            ExchangeError::Rejected("bad".into()).outcome(),
            Outcome::NothingHappened
        );
        assert_eq!(
            ExchangeError::Validation(ValidationError::Empty("code")).outcome(),
            Outcome::NothingHappened
        );
    }
}
