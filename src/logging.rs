//! # Structured Logging
//!
//! Console tracing setup shared by the worker binary and integration
//! tests. `INGEST_LOG` overrides the environment-derived level filter,
//! `INGEST_LOG_FORMAT=json` switches to JSON output for log shippers.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber once; later calls are no-ops,
/// as is calling into a process that already installed a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("INGEST_LOG")
            .unwrap_or_else(|_| default_log_level(&environment).to_string());
        let json_output = std::env::var("INGEST_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let init_result = if json_output {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(filter.clone())),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_filter(EnvFilter::new(filter.clone())),
                )
                .try_init()
        };

        if init_result.is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }

        tracing::info!(
            environment = %environment,
            filter = %filter,
            json = json_output,
            "structured logging initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("INGEST_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
