//! Network target and per-session state.

use crate::nonce::{Clock, NonceManager, SharedClock, SystemClock};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Which exchange deployment a session talks to.
///
/// `Custom` points at a non-production endpoint such as a local mock and
/// always signs as testnet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Custom {
        base_url: String,
    },
}

impl Network {
    pub fn base_url(&self) -> &str {
        match self {
            Self::Mainnet => MAINNET_API_URL,
            Self::Testnet => TESTNET_API_URL,
            Self::Custom { base_url } => base_url.trim_end_matches('/'),
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Chain name carried by user-signed actions.
    pub fn hyperliquid_chain(&self) -> &'static str {
        if self.is_mainnet() {
            "Mainnet"
        } else {
            "Testnet"
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Custom { base_url } => write!(f, "custom({base_url})"),
        }
    }
}

/// API endpoint on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Info,
    Exchange,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Info => "/info",
            Self::Exchange => "/exchange",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Exchange => "exchange",
        }
    }
}

/// Per-session state shared by an exchange and info gateway pair.
///
/// Immutable after construction apart from the nonce counter. A session
/// for another network is a new `Session`.
pub struct Session {
    network: Network,
    nonces: NonceManager<SharedClock>,
    vault_address: Option<Address>,
    account_address: Option<Address>,
}

impl Session {
    pub fn new(network: Network) -> Self {
        Self::with_clock(network, Arc::new(SystemClock))
    }

    pub fn with_clock(network: Network, clock: SharedClock) -> Self {
        Self {
            network,
            nonces: NonceManager::new(clock),
            vault_address: None,
            account_address: None,
        }
    }

    /// Act on behalf of a vault or sub-account.
    #[must_use]
    pub fn with_vault_address(mut self, vault: Address) -> Self {
        self.vault_address = Some(vault);
        self
    }

    /// Account queried by default for user-scoped info requests.
    #[must_use]
    pub fn with_account_address(mut self, account: Address) -> Self {
        self.account_address = Some(account);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.network.base_url(), endpoint.path())
    }

    pub fn vault_address(&self) -> Option<Address> {
        self.vault_address
    }

    pub fn account_address(&self) -> Option<Address> {
        self.account_address
    }

    pub fn next_nonce(&self) -> u64 {
        self.nonces.next()
    }

    /// Current session clock time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.nonces.now_ms()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("network", &self.network)
            .field("vault_address", &self.vault_address)
            .field("account_address", &self.account_address)
            .field("last_nonce", &self.nonces.last())
            .finish()
    }
}
