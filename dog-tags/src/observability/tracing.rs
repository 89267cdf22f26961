//! Optional subscriber setup for binaries and examples that embed the registry.

#[cfg(feature = "tracing-basic")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `dog_tags=info` when `RUST_LOG` is unset. Returns an
/// error if a global subscriber is already installed.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dog_tags=info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    }
}
