//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Workspace crates whose level follows the verbosity flag.
pub const CLIENT_TARGETS: &[&str] = &[
    "hlx",
    "hlx_cli",
    "hlx_core",
    "hlx_exchange",
    "hlx_info",
    "hlx_telemetry",
    "hlx_transport",
];

/// HTTP stack crates, capped at `warn` unless `RUST_LOG` says otherwise.
const HTTP_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `HLX_LOG_FORMAT` (`json` or `pretty`) when set, else JSON under
    /// `RUST_ENV=production`.
    pub fn from_env() -> Self {
        Self::select(
            std::env::var("HLX_LOG_FORMAT").ok().as_deref(),
            std::env::var("RUST_ENV").ok().as_deref(),
        )
    }

    fn select(format: Option<&str>, rust_env: Option<&str>) -> Self {
        match format.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ if rust_env == Some("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Directives used when `RUST_LOG` is unset or blank.
///
/// Client crates log at `info` (`debug` when verbose), everything else at
/// `warn` (`info` when verbose). The HTTP stack stays at `warn` either way.
pub fn default_directives(verbose: bool) -> String {
    let (base, client) = if verbose { ("info", "debug") } else { ("warn", "info") };
    std::iter::once(base.to_string())
        .chain(CLIENT_TARGETS.iter().map(|t| format!("{t}={client}")))
        .chain(HTTP_TARGETS.iter().map(|t| format!("{t}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// `rust_log` when it holds directives, the defaults otherwise. A
/// malformed `rust_log` is an error rather than a silent fallback.
pub fn build_filter(rust_log: Option<&str>, verbose: bool) -> TelemetryResult<EnvFilter> {
    let directives = match rust_log.map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => default_directives(verbose),
    };
    EnvFilter::try_new(&directives)
        .map_err(|e| TelemetryError::LogFilter(format!("{directives}: {e}")))
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init_logging(verbose: bool) -> TelemetryResult<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), verbose)?;

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(verbose),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
