//! Ensures that a single version of the `tracing` ecosystem is used across
//! all `probing` crates, the same way the teacher's `observability_deps`
//! crate pins logging for the whole IOx workspace.
//!
//! Downstream crates should `use probing_observability_deps::tracing::*;`
//! rather than depending on `tracing` directly.

pub use tracing;
pub use tracing_subscriber;

/// Installs a `tracing-subscriber` subscriber driven by the `LOG_LEVEL`
/// environment variable (falling back to `info`). Intended to be called once
/// by whatever process embeds `probing`.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).try_init();
}
