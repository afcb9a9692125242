//! Order lifecycle state machine.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local view of where an order is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderState {
    Submitted,
    Resting,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// Something that happened to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    /// Exchange accepted the order onto the book.
    Rested,
    PartialFill,
    Fill,
    Cancel,
    Reject,
    /// Order was modified; the exchange re-rests it under a new oid.
    Modify,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Resting => "resting",
            Self::PartiallyFilled => "partiallyFilled",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }

    /// Apply an event.
    ///
    /// Terminal states accept nothing. An illegal edge leaves the caller's
    /// state untouched and reports both ends.
    pub fn transition(self, event: OrderEvent) -> Result<OrderState, CoreError> {
        use OrderEvent as E;
        use OrderState as S;

        let next = match (self, event) {
            (S::Submitted, E::Rested) => S::Resting,
            (S::Submitted, E::Fill) => S::Filled,
            (S::Submitted, E::Reject) => S::Rejected,

            (S::Resting, E::Fill) => S::Filled,
            (S::Resting, E::PartialFill) => S::PartiallyFilled,
            (S::Resting, E::Cancel) => S::Cancelled,
            (S::Resting, E::Modify) => S::Resting,

            (S::PartiallyFilled, E::Fill) => S::Filled,
            (S::PartiallyFilled, E::PartialFill) => S::PartiallyFilled,
            (S::PartiallyFilled, E::Cancel) => S::Cancelled,
            (S::PartiallyFilled, E::Modify) => S::Resting,

            (from, event) => {
                return Err(CoreError::IllegalTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }

    /// Map an `orderStatus` status string to a local state.
    ///
    /// The exchange reports many cancel and reject reasons
    /// (`marginCanceled`, `perpMarginRejected`, ...); they collapse to
    /// `Cancelled` and `Rejected`.
    pub fn from_exchange_status(status: &str) -> Option<OrderState> {
        match status {
            "open" | "triggered" => Some(Self::Resting),
            "filled" => Some(Self::Filled),
            s if s == "canceled" || s.ends_with("Canceled") => Some(Self::Cancelled),
            s if s == "rejected" || s.ends_with("Rejected") => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = OrderState::Submitted
            .transition(OrderEvent::Rested)
            .and_then(|s| s.transition(OrderEvent::PartialFill))
            .and_then(|s| s.transition(OrderEvent::Fill))
            .unwrap();
        assert_eq!(state, OrderState::Filled);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_modify_keeps_order_resting() {
        assert_eq!(
            OrderState::Resting.transition(OrderEvent::Modify).unwrap(),
            OrderState::Resting
        );
        assert_eq!(
            OrderState::PartiallyFilled
                .transition(OrderEvent::Modify)
                .unwrap(),
            OrderState::Resting
        );
    }

    #[test]
    fn test_terminal_states_reject_events() {
        for terminal in [OrderState::Filled, OrderState::Cancelled, OrderState::Rejected] {
            for event in [
                OrderEvent::Rested,
                OrderEvent::Fill,
                OrderEvent::Cancel,
                OrderEvent::Modify,
            ] {
                assert!(matches!(
                    terminal.transition(event),
                    Err(CoreError::IllegalTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_submitted_cannot_be_cancelled() {
        assert!(OrderState::Submitted.transition(OrderEvent::Cancel).is_err());
    }

    #[test]
    fn test_from_exchange_status() {
        assert_eq!(OrderState::from_exchange_status("open"), Some(OrderState::Resting));
        assert_eq!(OrderState::from_exchange_status("filled"), Some(OrderState::Filled));
        assert_eq!(
            OrderState::from_exchange_status("marginCanceled"),
            Some(OrderState::Cancelled)
        );
        assert_eq!(
            OrderState::from_exchange_status("perpMarginRejected"),
            Some(OrderState::Rejected)
        );
        assert_eq!(OrderState::from_exchange_status("unknownOid"), None);
    }
}
