//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use std::env;
use std::io::IsTerminal;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON format for structured logging (ELK, Loki).
    Json,
    /// Human-readable pretty format with colors.
    Pretty,
    /// Compact single-line format.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::default(),
        })
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Log output format.
    pub log_format: LogFormat,
    /// Log level filter (e.g., "info", "kubepostgres_operator=debug,kube=info").
    pub log_filter: String,
    /// Whether to include source location in logs.
    pub include_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            include_location: false,
        }
    }
}

impl TracingConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KUBEPOSTGRES_LOG_FORMAT`: "json", "pretty", or "compact"
    /// - `KUBEPOSTGRES_LOG_LEVEL` or `RUST_LOG`: log filter string
    /// - `KUBEPOSTGRES_LOG_LOCATION`: "true" to include file and line
    ///
    /// `default_filter` applies when neither filter variable is set.
    pub fn from_env(default_filter: &str) -> Self {
        let log_format = env::var("KUBEPOSTGRES_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse::<LogFormat>().ok())
            .unwrap_or_else(|| {
                // Auto-detect: JSON for non-TTY (in-cluster), pretty for TTY
                if std::io::stdout().is_terminal() {
                    LogFormat::Pretty
                } else {
                    LogFormat::Json
                }
            });

        let log_filter = env::var("KUBEPOSTGRES_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| default_filter.to_string());

        Self {
            log_format,
            log_filter,
            include_location: env::var("KUBEPOSTGRES_LOG_LOCATION")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
        }
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location),
            )
            .try_init(),
    }
    .context("Failed to initialize tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_format() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("unknown".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    }
}
