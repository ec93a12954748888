//! Telemetry initialization: tracing subscriber with an env-driven filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Returns
/// `false` when a global subscriber was already installed, which is not an
/// error for embedding processes and test binaries that call this repeatedly.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Default filter derived from a configured log level.
pub fn default_filter(log_level: &str) -> String {
    format!("depot_backend={}", log_level)
}
