//! Logging setup built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Default filter: verbose for tessera, quiet for the wgpu stack.
pub const DEFAULT_FILTER: &str = "trace,wgpu_core=info,wgpu_hal=info,naga=info";

/// Install a global fmt subscriber using `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    init_with_filter(filter);
}

/// Install a global fmt subscriber with an explicit filter.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_filter(filter: impl Into<EnvFilter>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter.into())
        .try_init();
}
