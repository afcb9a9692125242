//! In-memory transport for tests.

use crate::error::{TransportError, TransportResult};
use crate::http::{BoxFuture, Transport};
use crate::session::Endpoint;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

/// A request seen by `MockTransport`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    pub body: Value,
}

/// Replays queued responses in order and records every request.
///
/// When the queue is empty the request fails with a network error that
/// never reached the exchange.
#[derive(Debug, Default)]
pub struct MockTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<VecDeque<TransportResult<Value>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, response: Value) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_err(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Bodies sent to `endpoint`, in order.
    pub fn bodies(&self, endpoint: Endpoint) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .map(|r| r.body.clone())
            .collect()
    }

    pub fn pending_responses(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
        self.responses.lock().clear();
    }
}

impl Transport for MockTransport {
    fn post(&self, endpoint: Endpoint, body: Value) -> BoxFuture<'_, TransportResult<Value>> {
        Box::pin(async move {
            self.requests.lock().push(RecordedRequest { endpoint, body });
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::Network {
                        message: "no queued response".to_string(),
                        request_sent: false,
                    })
                })
        })
    }
}
