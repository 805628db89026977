use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
