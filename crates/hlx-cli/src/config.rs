//! Application configuration.

use crate::error::{AppError, AppResult};
use alloy::primitives::Address;
use hlx_core::parse_address;
use hlx_exchange::KeySource;
use hlx_transport::Network;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when neither `--config` nor `HLX_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "HLX_CONFIG";

/// Where the trading key comes from. The key itself never appears in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum KeyConfig {
    /// Hex key in an environment variable.
    Env {
        #[serde(default = "default_key_var")]
        var: String,
    },
    /// Hex key in a file (recommend 0600 permissions).
    File { path: PathBuf },
}

fn default_key_var() -> String {
    "HLX_PRIVATE_KEY".to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::Env {
            var: default_key_var(),
        }
    }
}

impl From<&KeyConfig> for KeySource {
    fn from(cfg: &KeyConfig) -> Self {
        match cfg {
            KeyConfig::Env { var } => KeySource::EnvVar {
                var_name: var.clone(),
            },
            KeyConfig::File { path } => KeySource::File { path: path.clone() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// `"mainnet"`, `"testnet"`, or `{ custom = { base_url = "..." } }`.
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub key: KeyConfig,
    /// If set, the loaded key must derive this address.
    #[serde(default)]
    pub signer_address: Option<String>,
    /// Account queried by default for user-scoped info requests.
    #[serde(default)]
    pub account_address: Option<String>,
    /// Vault or sub-account to trade for.
    #[serde(default)]
    pub vault_address: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            key: KeyConfig::default(),
            signer_address: None,
            account_address: None,
            vault_address: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Path to load: CLI arg > `HLX_CONFIG` > default.
    pub fn resolve_path(cli: Option<String>) -> (String, bool) {
        match cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok()) {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_PATH.to_string(), false),
        }
    }

    /// Load from the resolved path.
    ///
    /// A missing default file falls back to defaults; a missing file the
    /// caller named explicitly is an error.
    pub fn load(cli: Option<String>) -> AppResult<Self> {
        let (path, explicit) = Self::resolve_path(cli);
        if !explicit && !Path::new(&path).exists() {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config("request_timeout_ms must be > 0".into()));
        }
        self.signer_address()?;
        self.account_address()?;
        self.vault_address()?;
        Ok(())
    }

    pub fn key_source(&self) -> KeySource {
        KeySource::from(&self.key)
    }

    pub fn signer_address(&self) -> AppResult<Option<Address>> {
        parse_optional(self.signer_address.as_deref())
    }

    pub fn account_address(&self) -> AppResult<Option<Address>> {
        parse_optional(self.account_address.as_deref())
    }

    pub fn vault_address(&self) -> AppResult<Option<Address>> {
        parse_optional(self.vault_address.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_optional(value: Option<&str>) -> AppResult<Option<Address>> {
    value.map(parse_address).transpose().map_err(Into::into)
}
