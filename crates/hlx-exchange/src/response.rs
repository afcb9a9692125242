//! Exchange response interpretation.
//!
//! `/exchange` answers one of:
//! - `{"status": "ok", "response": {"type": "order", "data": {"statuses": [...]}}}`
//! - `{"status": "ok", "response": {"type": "default"}}`
//! - `{"status": "err", "response": "message"}`
//!
//! Each entry of `statuses` is one of:
//! - `"success"` (cancels)
//! - `"waitingForFill"`, `"waitingForTrigger"`
//! - `{"resting": {"oid": 12345, "cloid": "0x..."}}`
//! - `{"filled": {"totalSz": "0.02", "avgPx": "1891.4", "oid": 12345}}`
//! - `{"error": "Error message"}`

use crate::error::{ExchangeError, ExchangeResult};
use hlx_core::Oid;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Substring the exchange uses for orders that cannot be cancelled.
const NOT_FOUND_MARKER: &str = "never placed";

/// Result of one order in a place or modify request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum OrderOutcome {
    Resting {
        oid: Oid,
        #[serde(skip_serializing_if = "Option::is_none")]
        cloid: Option<String>,
    },
    Filled {
        oid: Oid,
        total_size: Decimal,
        avg_price: Decimal,
    },
    /// Accepted but not yet on the book (`waitingForFill`, `waitingForTrigger`).
    Pending { reason: String },
    /// Rejected by the exchange; other orders in the batch are unaffected.
    Error { reason: String },
}

impl OrderOutcome {
    pub fn oid(&self) -> Option<Oid> {
        match self {
            Self::Resting { oid, .. } | Self::Filled { oid, .. } => Some(*oid),
            Self::Pending { .. } | Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    fn from_status(status: &Value) -> ExchangeResult<Self> {
        if let Some(s) = status.as_str() {
            return Ok(Self::Pending {
                reason: s.to_string(),
            });
        }

        if let Some(resting) = status.get("resting") {
            return Ok(Self::Resting {
                oid: take_oid(resting)?,
                cloid: resting
                    .get("cloid")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        if let Some(filled) = status.get("filled") {
            return Ok(Self::Filled {
                oid: take_oid(filled)?,
                total_size: take_decimal(filled, "totalSz")?,
                avg_price: take_decimal(filled, "avgPx")?,
            });
        }

        if let Some(error) = status.get("error") {
            return Ok(Self::Error {
                reason: error_message(error),
            });
        }

        warn!(status = %status, "Unknown order status format");
        Err(ExchangeError::decode(format!("unknown order status: {status}")))
    }
}

fn take_oid(value: &Value) -> ExchangeResult<Oid> {
    value
        .get("oid")
        .and_then(Value::as_u64)
        .ok_or_else(|| ExchangeError::decode(format!("status without oid: {value}")))
}

fn take_decimal(value: &Value, field: &str) -> ExchangeResult<Decimal> {
    let raw = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ExchangeError::decode(format!("status without {field}: {value}")))?;
    Decimal::from_str(raw).map_err(|e| ExchangeError::decode(format!("bad {field} {raw:?}: {e}")))
}

fn error_message(error: &Value) -> String {
    error
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// An `ok` response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResponse {
    pub response_type: String,
    pub data: Option<Value>,
}

impl ExchangeResponse {
    /// Split a raw body into `ok` or `Rejected`.
    pub fn parse(body: Value) -> ExchangeResult<Self> {
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ExchangeError::decode(format!("response without status: {body}")))?;

        match status {
            "ok" => {
                let response = body.get("response");
                let response_type = response
                    .and_then(|r| r.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("default")
                    .to_string();
                let data = response.and_then(|r| r.get("data")).cloned();
                Ok(Self {
                    response_type,
                    data,
                })
            }
            "err" => {
                let message = body
                    .get("response")
                    .map(error_message)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(ExchangeError::Rejected(message))
            }
            other => Err(ExchangeError::decode(format!("unknown response status {other:?}"))),
        }
    }

    /// `data.statuses`, checked against the number of items sent.
    pub fn statuses(&self, expected: usize) -> ExchangeResult<&[Value]> {
        let statuses = self
            .data
            .as_ref()
            .and_then(|d| d.get("statuses"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ExchangeError::decode(format!("{} response without statuses", self.response_type))
            })?;

        if statuses.len() != expected {
            return Err(ExchangeError::decode(format!(
                "expected {expected} statuses, got {}",
                statuses.len()
            )));
        }
        Ok(statuses)
    }

    /// One outcome per order sent, in request order.
    pub fn order_outcomes(&self, expected: usize) -> ExchangeResult<Vec<OrderOutcome>> {
        self.statuses(expected)?
            .iter()
            .map(OrderOutcome::from_status)
            .collect()
    }

    /// One result per cancel sent. `Err` carries the exchange's reason.
    pub fn cancel_results(&self, expected: usize) -> ExchangeResult<Vec<Result<(), String>>> {
        self.statuses(expected)?
            .iter()
            .map(|status| match status {
                Value::String(s) if s == "success" => Ok(Ok(())),
                other => match other.get("error") {
                    Some(error) => Ok(Err(error_message(error))),
                    None => Err(ExchangeError::decode(format!(
                        "unknown cancel status: {other}"
                    ))),
                },
            })
            .collect()
    }
}

/// Map a per-item rejection to the gateway error.
pub(crate) fn item_error(reason: String) -> ExchangeError {
    if reason.contains(NOT_FOUND_MARKER) {
        ExchangeError::OrderNotFound(reason)
    } else {
        ExchangeError::Rejected(reason)
    }
}
