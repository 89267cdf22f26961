pub mod metrics;
pub mod tracing;

pub use metrics::{MetricsSnapshot, RegistryMetrics};

#[cfg(feature = "tracing-basic")]
pub use self::tracing::init_tracing;
