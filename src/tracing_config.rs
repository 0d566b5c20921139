//! Tracing subscriber setup for binaries embedding this crate.
//!
//! The library itself only emits events; installing a subscriber is the
//! binary's job.

use crate::error::TokenError;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable lines
    Text,
}

impl FromStr for LogFormat {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(TokenError::config(format!("Invalid LOG_FORMAT: {}", s))),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Name recorded once the subscriber is up
    pub service_name: String,
    /// Default filter directive; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            log_level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TracingConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the default filter directive.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Install the global subscriber. Call once at startup.
///
/// Events go to stderr; stdout carries command output.
pub fn init_tracing(config: &TracingConfig) {
    let registry = tracing_subscriber::registry().with(config.filter());
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => registry.with(layer.json()).init(),
        LogFormat::Text => registry.with(layer).init(),
    }

    tracing::debug!(service = %config.service_name, "Tracing initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "token-auth");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::default()
            .with_service_name("verifier-sidecar")
            .with_log_level("token_auth=debug")
            .with_format(LogFormat::Text);

        assert_eq!(config.service_name, "verifier-sidecar");
        assert_eq!(config.log_level, "token_auth=debug");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!(matches!("yaml".parse::<LogFormat>(), Err(TokenError::Config(_))));
    }
}
