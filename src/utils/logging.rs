use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honouring `RUST_LOG` and falling back to `default_level`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();
}
