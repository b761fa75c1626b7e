//! Development helper for structured logging in tests and demos.

/// Install a `tracing` fmt subscriber when `RUST_LOG` is set.
///
/// No-op when the variable is absent or a global subscriber is already
/// installed, so tests can call it unconditionally.
pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
