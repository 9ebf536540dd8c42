//! Structured tracing setup.
//!
//! Logging is controlled by the `RUST_LOG` environment variable; the
//! default level is `warn`. Log output goes to stderr so report output on
//! stdout stays clean.
//!
//! ```bash
//! RUST_LOG=info pyvet analyze .
//! RUST_LOG=pyvet=debug pyvet analyze src/
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber. Call once, before any analysis.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Variant for tests and programmatic use; ignores double initialization.
pub fn init_tracing_with_filter(filter: &str) {
    let filter = EnvFilter::new(filter);
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
