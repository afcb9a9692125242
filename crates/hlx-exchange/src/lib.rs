//! Signed exchange actions for the hlx exchange client.
//!
//! # Key Components
//!
//! - [`ExchangeClient`]: one async method per exchange action
//! - [`Signer`]: L1 (phantom agent) and user-signed EIP-712 signatures
//! - [`Action`]: closed set of wire actions, serde-tagged by `type`
//! - [`encoder`]: caller requests to validated actions
//! - [`OrderRegistry`]: local oid/cloid index of placed orders
//!
//! # Pipeline (every `ExchangeClient` method)
//!
//! 1. Validate and encode -> `Validation`, nothing sent
//! 2. Nonce (session counter, or the one embedded in user-signed actions)
//! 3. Sign -> `Signing`
//! 4. POST `/exchange` once -> `Transport`
//! 5. Interpret -> `Rejected`, `OrderNotFound`, or a structured result

pub mod actions;
pub mod client;
pub mod encoder;
pub mod error;
pub mod registry;
pub mod response;
pub mod signer;

pub use actions::{Action, SigningScheme};
pub use client::ExchangeClient;
pub use encoder::ActionEnvelope;
pub use error::{ExchangeError, ExchangeResult, Outcome};
pub use registry::{OrderRecord, OrderRegistry, DEFAULT_TERMINAL_RETENTION};
pub use response::{ExchangeResponse, OrderOutcome};
pub use signer::{
    signature_chain_id, ActionSignature, KeyError, KeyManager, KeySource, PhantomAgent, Signer,
    SignerError, SigningInput,
};
