use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::{
    backend::{InsertOutcome, TagBackend, UsageOrder},
    normalize::{normalize, CaseSensitivity, LikePattern},
    Tag, TagId, TagResult, TenantId,
};

type TenantTags = HashMap<TenantId, Vec<Tag>>;

/// In-memory backend for testing and development.
///
/// The uniqueness check and the write happen under one write lock, which
/// is what makes concurrent find-or-create callers converge on one record.
pub struct MemoryBackend {
    /// Tag records: tenant_id -> tags in creation order
    tags: RwLock<TenantTags>,

    rollbacks: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tags: RwLock::new(HashMap::new()),
            rollbacks: AtomicU64::new(0),
        }
    }

    /// All tags of a tenant in creation order
    pub fn tags(&self, tenant: &TenantId) -> Vec<Tag> {
        self.tags.read().get(tenant).cloned().unwrap_or_default()
    }

    pub fn len(&self, tenant: &TenantId) -> usize {
        self.tags.read().get(tenant).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, tenant: &TenantId) -> bool {
        self.len(tenant) == 0
    }

    /// Number of rollbacks requested by callers so far
    pub fn rollback_count(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Overwrite the usage counter the tagging subsystem maintains.
    ///
    /// Returns false when the tag does not exist in this tenant.
    pub fn set_usage_count(&self, tenant: &TenantId, id: &TagId, count: u64) -> bool {
        let mut tags = self.tags.write();
        match tags
            .get_mut(tenant)
            .and_then(|tenant_tags| tenant_tags.iter_mut().find(|tag| &tag.id == id))
        {
            Some(tag) => {
                tag.usage_count = count;
                true
            }
            None => false,
        }
    }

    /// Drop a tag, as the cascade from its last tagging would
    pub fn remove(&self, tenant: &TenantId, id: &TagId) -> bool {
        let mut tags = self.tags.write();
        let Some(tenant_tags) = tags.get_mut(tenant) else {
            return false;
        };
        let before = tenant_tags.len();
        tenant_tags.retain(|tag| &tag.id != id);
        before != tenant_tags.len()
    }
}

#[async_trait]
impl TagBackend for MemoryBackend {
    async fn query_exact(
        &self,
        tenant: &TenantId,
        sensitivity: CaseSensitivity,
        keys: &[String],
    ) -> TagResult<Vec<Tag>> {
        let tags = self.tags.read();
        let Some(tenant_tags) = tags.get(tenant) else {
            return Ok(Vec::new());
        };

        Ok(tenant_tags
            .iter()
            .filter(|tag| {
                let stored = normalize(&tag.name, sensitivity);
                keys.iter().any(|key| key.as_str() == stored)
            })
            .cloned()
            .collect())
    }

    async fn query_contains(
        &self,
        tenant: &TenantId,
        patterns: &[LikePattern],
    ) -> TagResult<Vec<Tag>> {
        let tags = self.tags.read();
        let Some(tenant_tags) = tags.get(tenant) else {
            return Ok(Vec::new());
        };

        Ok(tenant_tags
            .iter()
            .filter(|tag| patterns.iter().any(|pattern| pattern.matches(&tag.name)))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        tenant: &TenantId,
        raw_name: &str,
        sensitivity: CaseSensitivity,
    ) -> TagResult<InsertOutcome> {
        let key = normalize(raw_name, sensitivity);

        let mut tags = self.tags.write();
        let tenant_tags = tags.entry(tenant.clone()).or_default();

        if tenant_tags
            .iter()
            .any(|tag| normalize(&tag.name, sensitivity) == key)
        {
            trace!(tenant_id = %tenant, name = raw_name, "unique index violation");
            return Ok(InsertOutcome::UniquenessConflict);
        }

        let tag = Tag::new(tenant.clone(), raw_name);
        tenant_tags.push(tag.clone());
        Ok(InsertOutcome::Created(tag))
    }

    async fn rollback_failed_transaction(&self) -> TagResult<()> {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn query_by_usage(
        &self,
        tenant: &TenantId,
        order: UsageOrder,
        limit: usize,
    ) -> TagResult<Vec<Tag>> {
        let mut ranked = self.tags(tenant);
        match order {
            UsageOrder::MostUsed => ranked.sort_by(|a, b| b.usage_count.cmp(&a.usage_count)),
            UsageOrder::LeastUsed => ranked.sort_by(|a, b| a.usage_count.cmp(&b.usage_count)),
        }
        ranked.truncate(limit);
        Ok(ranked)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::from("test_tenant")
    }

    async fn create(backend: &MemoryBackend, name: &str) -> Tag {
        match backend
            .insert(&tenant(), name, CaseSensitivity::CaseInsensitive)
            .await
            .unwrap()
        {
            InsertOutcome::Created(tag) => tag,
            InsertOutcome::UniquenessConflict => panic!("unexpected conflict for {}", name),
        }
    }

    #[tokio::test]
    async fn test_insert_then_query() {
        let backend = MemoryBackend::new();
        let tag = create(&backend, "Rust").await;

        let found = backend
            .query_exact(&tenant(), CaseSensitivity::CaseInsensitive, &["rust".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tag.id);

        let strict = backend
            .query_exact(&tenant(), CaseSensitivity::StrictCaseMatch, &["rust".to_string()])
            .await
            .unwrap();
        assert!(strict.is_empty());
    }

    #[tokio::test]
    async fn test_uniqueness_follows_sensitivity() {
        let backend = MemoryBackend::new();
        create(&backend, "Rust").await;

        let folded = backend
            .insert(&tenant(), "RUST", CaseSensitivity::CaseInsensitive)
            .await
            .unwrap();
        assert!(matches!(folded, InsertOutcome::UniquenessConflict));

        let strict = backend
            .insert(&tenant(), "RUST", CaseSensitivity::StrictCaseMatch)
            .await
            .unwrap();
        assert!(matches!(strict, InsertOutcome::Created(_)));
        assert_eq!(backend.len(&tenant()), 2);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let backend = MemoryBackend::new();
        create(&backend, "rust").await;

        let other = TenantId::from("other_tenant");
        let outcome = backend
            .insert(&other, "rust", CaseSensitivity::CaseInsensitive)
            .await
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Created(_)));

        let hits = backend
            .query_contains(&other, &[LikePattern::contains("ru")])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tenant_id, other);
    }

    #[tokio::test]
    async fn test_usage_ordering_and_limit() {
        let backend = MemoryBackend::new();
        let a = create(&backend, "a").await;
        let b = create(&backend, "b").await;
        let c = create(&backend, "c").await;
        assert!(backend.set_usage_count(&tenant(), &a.id, 5));
        assert!(backend.set_usage_count(&tenant(), &b.id, 9));
        assert!(backend.set_usage_count(&tenant(), &c.id, 1));

        let most = backend
            .query_by_usage(&tenant(), UsageOrder::MostUsed, 2)
            .await
            .unwrap();
        let names: Vec<_> = most.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let least = backend
            .query_by_usage(&tenant(), UsageOrder::LeastUsed, 1)
            .await
            .unwrap();
        assert_eq!(least[0].name, "c");
    }

    #[tokio::test]
    async fn test_remove_frees_name() {
        let backend = MemoryBackend::new();
        let tag = create(&backend, "rust").await;
        assert!(backend.remove(&tenant(), &tag.id));
        assert!(!backend.remove(&tenant(), &tag.id));
        assert!(backend.is_empty(&tenant()));
        create(&backend, "rust").await;
    }

    #[tokio::test]
    async fn test_rollback_is_counted() {
        let backend = MemoryBackend::new();
        backend.rollback_failed_transaction().await.unwrap();
        assert_eq!(backend.rollback_count(), 1);
    }
}
