pub mod memory;

use async_trait::async_trait;

use crate::{
    normalize::{CaseSensitivity, LikePattern},
    Tag, TagResult, TenantId,
};

/// Outcome of an insert against the (tenant, normalized name) constraint
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(Tag),
    /// Another writer already holds this normalized name
    UniquenessConflict,
}

/// Sort direction for usage-count queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOrder {
    MostUsed,
    LeastUsed,
}

/// Storage primitives the registry is built on.
///
/// Implementations own the uniqueness constraint: `insert` must refuse a
/// second tag whose name normalizes to the same key within one tenant.
#[async_trait]
pub trait TagBackend: Send + Sync {
    /// Tags in `tenant` whose name, normalized under `sensitivity`, equals
    /// any of the already-normalized `keys`
    async fn query_exact(
        &self,
        tenant: &TenantId,
        sensitivity: CaseSensitivity,
        keys: &[String],
    ) -> TagResult<Vec<Tag>>;

    /// Tags in `tenant` whose name matches any of `patterns`
    async fn query_contains(
        &self,
        tenant: &TenantId,
        patterns: &[LikePattern],
    ) -> TagResult<Vec<Tag>>;

    /// Insert a tag, reporting a conflict instead of failing
    async fn insert(
        &self,
        tenant: &TenantId,
        raw_name: &str,
        sensitivity: CaseSensitivity,
    ) -> TagResult<InsertOutcome>;

    /// Clear any transactional error state left by a conflicting insert
    async fn rollback_failed_transaction(&self) -> TagResult<()>;

    /// Tags in `tenant` ordered by usage count
    async fn query_by_usage(
        &self,
        tenant: &TenantId,
        order: UsageOrder,
        limit: usize,
    ) -> TagResult<Vec<Tag>>;
}
