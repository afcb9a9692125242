//! Transport abstraction and the reqwest-backed implementation.
//!
//! Gateways hold a `DynTransport` so tests can swap in `MockTransport`.
//! No transport retries: a failed request is reported once and the
//! caller decides what to do.

use crate::error::{TransportError, TransportResult};
use crate::session::{Endpoint, Network, Session};
use reqwest::Client;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs JSON bodies to an exchange endpoint.
pub trait Transport: Send + Sync {
    fn post(&self, endpoint: Endpoint, body: Value) -> BoxFuture<'_, TransportResult<Value>>;

    /// Network the requests go to, when the transport is bound to one.
    fn network(&self) -> Option<&Network> {
        None
    }
}

/// Arc wrapper for Transport trait objects.
pub type DynTransport = Arc<dyn Transport>;

/// How a request ended, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Ok,
    Http,
    Timeout,
    Network,
    Decode,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Http => "http_error",
            Self::Timeout => "timeout",
            Self::Network => "network_error",
            Self::Decode => "decode_error",
        }
    }

    pub fn of(result: &TransportResult<Value>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(TransportError::Http { .. }) => Self::Http,
            Err(TransportError::Timeout) => Self::Timeout,
            Err(TransportError::Network { .. }) => Self::Network,
            Err(TransportError::Decode(_)) => Self::Decode,
        }
    }
}

/// Hook for recording request counts and latency.
pub trait RequestObserver: Send + Sync {
    fn observe(&self, endpoint: Endpoint, outcome: RequestOutcome, latency: Duration);

    /// One gateway action finished with `result` (`"ok"`, `"rejected"`, ...).
    fn observe_action(&self, _action: &'static str, _result: &'static str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {
    fn observe(&self, _endpoint: Endpoint, _outcome: RequestOutcome, _latency: Duration) {}
}

/// HTTP transport over reqwest.
///
/// Bound to one session: every URL comes from [`Session::url`], so the
/// requests go to the network the session signs for.
pub struct HttpTransport {
    client: Client,
    session: Arc<Session>,
    observer: Arc<dyn RequestObserver>,
}

impl HttpTransport {
    pub fn new(session: Arc<Session>) -> TransportResult<Self> {
        Self::with_timeout(session, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(session: Arc<Session>, timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("Failed to create HTTP client: {e}"),
                request_sent: false,
            })?;

        Ok(Self {
            client,
            session,
            observer: Arc::new(NoopObserver),
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn send(&self, endpoint: Endpoint, body: Value) -> TransportResult<Value> {
        let url = self.session.url(endpoint);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network {
                    message: format!("Failed to read response body: {e}"),
                    request_sent: true,
                }
            }
        })?;

        debug!(%url, status = status.as_u16(), bytes = text.len(), "Response received");

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| TransportError::Decode(format!("{e}: {}", truncate_body(&text))))
    }
}

impl Transport for HttpTransport {
    fn post(&self, endpoint: Endpoint, body: Value) -> BoxFuture<'_, TransportResult<Value>> {
        Box::pin(async move {
            let started = Instant::now();
            let result = self.send(endpoint, body).await;
            let outcome = RequestOutcome::of(&result);
            if let Err(e) = &result {
                warn!(endpoint = endpoint.as_str(), error = %e, "Request failed");
            }
            self.observer.observe(endpoint, outcome, started.elapsed());
            result
        })
    }

    fn network(&self) -> Option<&Network> {
        Some(self.session.network())
    }
}

/// Map a reqwest send error onto the transport taxonomy.
///
/// Connect failures never reached the exchange; anything later might have.
fn classify_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() || e.is_builder() {
        TransportError::Network {
            message: e.to_string(),
            request_sent: false,
        }
    } else {
        TransportError::Network {
            message: e.to_string(),
            request_sent: true,
        }
    }
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 256;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(Endpoint, RequestOutcome)>>);

    impl RequestObserver for Recording {
        fn observe(&self, endpoint: Endpoint, outcome: RequestOutcome, _latency: Duration) {
            self.0.lock().push((endpoint, outcome));
        }
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(RequestOutcome::of(&Ok(Value::Null)), RequestOutcome::Ok);
        assert_eq!(
            RequestOutcome::of(&Err(TransportError::Timeout)).as_str(),
            "timeout"
        );
        assert_eq!(
            RequestOutcome::of(&Err(TransportError::Http {
                status: 429,
                body: String::new()
            })),
            RequestOutcome::Http
        );
    }

    #[test]
    fn test_bound_to_session_network() {
        let session = Arc::new(Session::new(Network::Mainnet));
        let transport = HttpTransport::new(Arc::clone(&session)).unwrap();
        assert_eq!(transport.network(), Some(&Network::Mainnet));
        assert_eq!(
            transport.session.url(Endpoint::Exchange),
            "https://api.hyperliquid.xyz/exchange"
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_body(&long).len(), 256);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_not_sent() {
        let session = Arc::new(Session::new(Network::Custom {
            base_url: "http://127.0.0.1:1".to_string(),
        }));
        let observer = Arc::new(Recording::default());
        let transport = HttpTransport::with_timeout(session, Duration::from_secs(2))
            .unwrap()
            .with_observer(observer.clone());

        let err = transport
            .post(Endpoint::Info, serde_json::json!({"type": "allMids"}))
            .await
            .unwrap_err();

        assert!(!err.may_have_reached_exchange());
        assert_eq!(observer.0.lock().len(), 1);
        assert_eq!(observer.0.lock()[0].0, Endpoint::Info);
    }
}
