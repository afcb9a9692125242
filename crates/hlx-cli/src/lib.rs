//! Command-line front end for the hlx exchange client.
//!
//! Thin wrapper over the gateways: every command maps to one gateway
//! call and prints JSON on stdout.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, KeyConfig};
pub use error::{AppError, AppResult};
