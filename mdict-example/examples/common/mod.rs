//! Common utilities shared across examples.

#![allow(dead_code)]

use std::env;
use std::time::Duration;

/// Default service that provides the dictionaries.
pub const DEFAULT_PROVIDER: &str = "DIRECT_FEED";

/// Default service that only uses the dictionaries.
pub const DEFAULT_CONSUMER_SERVICE: &str = "IDN_RDF";

/// Example configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Service that provides RWFFld and RWFEnum.
    pub provider: String,
    /// Service that uses them.
    pub consumer_service: String,
    /// Number of concurrent sessions opened for the same dictionary.
    pub sessions: usize,
    /// Number of field definitions in the simulated RWFFld.
    pub field_count: usize,
    /// Simulated upstream latency.
    pub latency: Duration,
    /// Capacity of the request and event channels.
    pub channel_size: usize,
}

impl ExampleConfig {
    /// Loads the configuration from `MDICT_*` variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            provider: env::var("MDICT_PROVIDER").unwrap_or_else(|_| DEFAULT_PROVIDER.to_string()),
            consumer_service: env::var("MDICT_CONSUMER_SERVICE")
                .unwrap_or_else(|_| DEFAULT_CONSUMER_SERVICE.to_string()),
            sessions: parse_var("MDICT_SESSIONS", 4),
            field_count: parse_var("MDICT_FIELD_COUNT", 64),
            latency: Duration::from_millis(parse_var("MDICT_LATENCY_MS", 25)),
            channel_size: parse_var("MDICT_CHANNEL_SIZE", 1000),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
