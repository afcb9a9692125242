//! Session state and HTTP transport for the hlx exchange client.
//!
//! - `Session`: network target, nonce counter, vault/account addresses
//! - `Transport`: POST to `/info` or `/exchange`, with an HTTP and a mock implementation

pub mod error;
pub mod http;
pub mod mock;
pub mod nonce;
pub mod session;

pub use error::{TransportError, TransportResult};
pub use http::{
    BoxFuture, DynTransport, HttpTransport, NoopObserver, RequestObserver, RequestOutcome,
    Transport, DEFAULT_TIMEOUT,
};
pub use mock::{MockTransport, RecordedRequest};
pub use nonce::{Clock, ManualClock, NonceManager, SharedClock, SystemClock};
pub use session::{Endpoint, Network, Session, MAINNET_API_URL, TESTNET_API_URL};
