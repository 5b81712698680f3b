//! Tracing subscriber setup shared by the binaries
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// JSON lines on stdout, for the server
pub fn init_json(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json().with_filter(filter(log_level)))
        .init();
}

/// Compact human-readable logs on stderr, so command output stays clean on stdout
pub fn init_cli(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter(log_level)),
        )
        .init();
}
