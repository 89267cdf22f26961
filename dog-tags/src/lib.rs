//! # dog-tags: Multi-tenant tag registry
//!
//! Maps free-text tag names to canonical tag records, one per
//! (tenant, normalized name), and resolves batches of names to existing or
//! freshly created tags while other callers race to create the same ones.
//!
//! - **Race-safe find-or-create**: optimistic insert against the backend's
//!   uniqueness constraint, bounded re-probe/retry on conflict
//! - **Runtime case policy**: strict byte matching or Unicode-aware
//!   case-insensitive matching, switchable while the registry is live
//! - **Tenant scoped**: every lookup and insert carries a `TagCtx`
//! - **Pluggable storage**: implement `TagBackend`; `MemoryBackend` ships for
//!   tests and development
//!
//! ```rust
//! use dog_tags::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> TagResult<()> {
//! let registry = TagRegistry::new(MemoryBackend::new());
//! let ctx = TagCtx::new("acme");
//!
//! let tags = registry
//!     .find_or_create_all_by_names(&ctx, &["rust", "Tokio", "RUST"])
//!     .await?;
//! assert_eq!(tags[0].id, tags[2].id);
//!
//! registry.policy().set(CaseSensitivity::StrictCaseMatch);
//! assert!(registry.find_by_name(&ctx, "tokio").await?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod normalize;
pub mod observability;
pub mod registry;
pub mod types;

pub use backend::{memory::MemoryBackend, InsertOutcome, TagBackend, UsageOrder};
pub use config::{BatchFailurePolicy, RegistryConfig};
pub use error::{InvalidNameReason, TagError, TagResult};
pub use normalize::{CasePolicy, CaseSensitivity};
pub use observability::{MetricsSnapshot, RegistryMetrics};
pub use registry::{TagRegistry, DEFAULT_USAGE_LIMIT};
pub use types::{Tag, TagCtx, TagId, TenantId};

pub mod prelude {
    pub use crate::{
        CasePolicy, CaseSensitivity, MemoryBackend, RegistryConfig, Tag, TagBackend, TagCtx,
        TagError, TagRegistry, TagResult, TenantId,
    };

    pub use async_trait::async_trait;
}
