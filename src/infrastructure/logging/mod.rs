//! Logging initialization.

use tracing_subscriber::EnvFilter;

use crate::domain::models::LoggingConfig;

/// Initializes the global tracing subscriber from the logging config.
/// `RUST_LOG` overrides the configured level when set.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }
}
