use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    backend::{InsertOutcome, TagBackend, UsageOrder},
    config::{BatchFailurePolicy, RegistryConfig},
    normalize::{normalize, CasePolicy, LikePattern},
    observability::RegistryMetrics,
    Tag, TagCtx, TagError, TagResult,
};

/// Default row limit for `most_used` / `least_used`
pub const DEFAULT_USAGE_LIMIT: usize = 20;

/// Resolves raw tag names to canonical, per-tenant tag records.
///
/// The registry keeps no tag state of its own. Deduplication rests on the
/// backend's uniqueness constraint: creation is attempted optimistically and
/// a lost race is reconciled by probing again, up to `max_attempts` times.
pub struct TagRegistry<B: TagBackend + ?Sized> {
    backend: Arc<B>,
    policy: CasePolicy,
    config: RegistryConfig,
    metrics: Arc<RegistryMetrics>,
}

impl<B: TagBackend> TagRegistry<B> {
    /// Create a registry with the default configuration
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RegistryConfig::default())
    }

    pub fn with_config(backend: B, config: RegistryConfig) -> Self {
        Self::from_shared(Arc::new(backend), config)
    }
}

impl<B: TagBackend + ?Sized> TagRegistry<B> {
    /// Create a registry over a backend that is shared with other owners
    pub fn from_shared(backend: Arc<B>, config: RegistryConfig) -> Self {
        Self {
            backend,
            policy: CasePolicy::new(config.case_sensitivity),
            config,
            metrics: Arc::new(RegistryMetrics::new()),
        }
    }

    /// Use an externally owned policy handle instead of a private one
    pub fn with_policy(mut self, policy: CasePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Live case sensitivity setting; changes apply to the next decision
    pub fn policy(&self) -> &CasePolicy {
        &self.policy
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Reject blank names and names over the length bound
    pub fn validate_name(&self, name: &str) -> TagResult<()> {
        if name.trim().is_empty() {
            return Err(TagError::blank(name));
        }
        if name.chars().count() > self.config.max_name_length {
            return Err(TagError::too_long(name, self.config.max_name_length));
        }
        Ok(())
    }

    /// Exact (policy-normalized) lookup of a single name
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id))]
    pub async fn find_by_name(&self, ctx: &TagCtx, name: &str) -> TagResult<Option<Tag>> {
        let sensitivity = self.policy.get();
        let key = normalize(name, sensitivity).into_owned();

        self.metrics.increment_lookups();
        let found = self
            .storage(
                ctx,
                "query_exact",
                self.backend
                    .query_exact(&ctx.tenant_id, sensitivity, std::slice::from_ref(&key)),
            )
            .await?;

        Ok(found.into_iter().next())
    }

    /// All tags matching any of `names` exactly; order is storage-defined
    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id, names = names.len()))]
    pub async fn find_any_by_names<S>(&self, ctx: &TagCtx, names: &[S]) -> TagResult<Vec<Tag>>
    where
        S: AsRef<str> + Sync,
    {
        let sensitivity = self.policy.get();
        let mut keys: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let key = normalize(name.as_ref(), sensitivity).into_owned();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        self.metrics.increment_lookups();
        let found = self
            .storage(
                ctx,
                "query_exact",
                self.backend.query_exact(&ctx.tenant_id, sensitivity, &keys),
            )
            .await?;

        debug!(keys = keys.len(), found = found.len(), "exact probe");
        Ok(found)
    }

    /// Case-insensitive substring match against any of `names`
    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id, names = names.len()))]
    pub async fn find_like_any<S>(&self, ctx: &TagCtx, names: &[S]) -> TagResult<Vec<Tag>>
    where
        S: AsRef<str> + Sync,
    {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let patterns: Vec<LikePattern> = names
            .iter()
            .map(|name| LikePattern::contains(name.as_ref()))
            .collect();

        self.metrics.increment_lookups();
        self.storage(
            ctx,
            "query_contains",
            self.backend.query_contains(&ctx.tenant_id, &patterns),
        )
        .await
    }

    /// Find a tag by name, creating it when absent.
    ///
    /// Under strict matching this runs the retrying batch path. Under
    /// case-insensitive matching it reuses the first substring match and
    /// otherwise inserts once; a conflict on that insert is not retried.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id))]
    pub async fn find_or_create_by_name(&self, ctx: &TagCtx, name: &str) -> TagResult<Tag> {
        self.validate_name(name)?;

        if self.policy.is_strict() {
            let mut tags = self.find_or_create_all_by_names(ctx, &[name]).await?;
            return tags
                .pop()
                .ok_or_else(|| TagError::DuplicateTag(name.to_string()));
        }

        if let Some(tag) = self.find_like_any(ctx, &[name]).await?.into_iter().next() {
            self.metrics.increment_tags_reused();
            return Ok(tag);
        }

        let sensitivity = self.policy.get();
        match self
            .storage(
                ctx,
                "insert",
                self.backend.insert(&ctx.tenant_id, name, sensitivity),
            )
            .await?
        {
            InsertOutcome::Created(tag) => {
                self.metrics.increment_tags_created();
                info!(tag_id = %tag.id, "created tag");
                Ok(tag)
            }
            InsertOutcome::UniquenessConflict => {
                self.metrics.increment_uniqueness_conflicts();
                self.metrics.increment_duplicate_failures();
                warn!("uniqueness conflict on single-name create");
                Err(TagError::DuplicateTag(name.to_string()))
            }
        }
    }

    /// Resolve every name to a tag, creating missing ones.
    ///
    /// The result follows the input order. Names are validated up front, so
    /// an invalid name fails the call before any storage access. When one
    /// name exhausts its attempts, `BatchFailurePolicy` decides between
    /// failing the call and leaving that name out; tags already created by
    /// this call stay committed either way.
    ///
    /// Under `SkipFailed` a left-out name shifts every later tag one slot
    /// forward, so positions no longer line up with `names`. Use
    /// [`find_or_create_each_by_name`](Self::find_or_create_each_by_name)
    /// when the caller needs that alignment.
    pub async fn find_or_create_all_by_names<S>(
        &self,
        ctx: &TagCtx,
        names: &[S],
    ) -> TagResult<Vec<Tag>>
    where
        S: AsRef<str> + Sync,
    {
        let resolved = self.find_or_create_each_by_name(ctx, names).await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Like `find_or_create_all_by_names`, but with exactly one slot per
    /// input name. A slot is `None` only when `SkipFailed` left that name out.
    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id, names = names.len()))]
    pub async fn find_or_create_each_by_name<S>(
        &self,
        ctx: &TagCtx,
        names: &[S],
    ) -> TagResult<Vec<Option<Tag>>>
    where
        S: AsRef<str> + Sync,
    {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        for name in names {
            self.validate_name(name.as_ref())?;
        }

        let batch: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
        let concurrency = self.config.batch_concurrency.max(1);
        let mut slots = Vec::with_capacity(batch.len());

        for chunk in batch.chunks(concurrency) {
            let pending: Vec<_> = chunk
                .iter()
                .map(|name| self.resolve(ctx, &batch, name))
                .collect();
            let outcomes = join_all(pending).await;

            for (name, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(tag) => slots.push(Some(tag)),
                    Err(TagError::DuplicateTag(_))
                        if self.config.batch_failure == BatchFailurePolicy::SkipFailed =>
                    {
                        warn!(tag = %name, "leaving unresolved tag out of batch");
                        slots.push(None);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(slots)
    }

    /// Most used tags of the tenant, highest usage count first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id))]
    pub async fn most_used(&self, ctx: &TagCtx, limit: usize) -> TagResult<Vec<Tag>> {
        self.storage(
            ctx,
            "query_by_usage",
            self.backend
                .query_by_usage(&ctx.tenant_id, UsageOrder::MostUsed, limit),
        )
        .await
    }

    /// Least used tags of the tenant, lowest usage count first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, trace_id = ?ctx.trace_id))]
    pub async fn least_used(&self, ctx: &TagCtx, limit: usize) -> TagResult<Vec<Tag>> {
        self.storage(
            ctx,
            "query_by_usage",
            self.backend
                .query_by_usage(&ctx.tenant_id, UsageOrder::LeastUsed, limit),
        )
        .await
    }

    /// Probe/create loop for one name of a batch.
    ///
    /// Each attempt re-probes the whole batch, so a row created by a
    /// concurrent winner is picked up before inserting again.
    async fn resolve(&self, ctx: &TagCtx, batch: &[&str], name: &str) -> TagResult<Tag> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let existing = self.find_any_by_names(ctx, batch).await?;

            let sensitivity = self.policy.get();
            let key = normalize(name, sensitivity).into_owned();
            if let Some(tag) = existing
                .into_iter()
                .find(|tag| normalize(&tag.name, sensitivity) == key.as_str())
            {
                self.metrics.increment_tags_reused();
                debug!(tag = %name, attempt, "resolved to existing tag");
                return Ok(tag);
            }

            let outcome = self
                .storage(
                    ctx,
                    "insert",
                    self.backend.insert(&ctx.tenant_id, name, sensitivity),
                )
                .await?;

            match outcome {
                InsertOutcome::Created(tag) => {
                    self.metrics.increment_tags_created();
                    info!(tag = %name, tag_id = %tag.id, attempt, "created tag");
                    return Ok(tag);
                }
                InsertOutcome::UniquenessConflict => {
                    self.metrics.increment_uniqueness_conflicts();

                    if attempt >= max_attempts {
                        self.metrics.increment_duplicate_failures();
                        error!(tag = %name, attempts = attempt, "giving up after repeated uniqueness conflicts");
                        return Err(TagError::DuplicateTag(name.to_string()));
                    }

                    warn!(tag = %name, attempt, "lost creation race, retrying");
                    self.storage(
                        ctx,
                        "rollback_failed_transaction",
                        self.backend.rollback_failed_transaction(),
                    )
                    .await?;
                    self.metrics.increment_rollbacks();
                    attempt += 1;
                }
            }
        }
    }

    /// Run a storage call under the caller's deadline, or the configured
    /// per-call timeout when the caller gave none
    async fn storage<T, F>(&self, ctx: &TagCtx, operation: &'static str, call: F) -> TagResult<T>
    where
        F: Future<Output = TagResult<T>>,
    {
        if ctx.is_expired() {
            self.metrics.increment_aborted();
            warn!(operation, "deadline already passed, skipping storage call");
            return Err(TagError::Aborted(format!("{} after deadline", operation)));
        }

        let deadline = ctx
            .deadline
            .or_else(|| self.config.operation_timeout.map(|timeout| Instant::now() + timeout));

        let Some(deadline) = deadline else {
            return call.await;
        };

        match tokio::time::timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.increment_aborted();
                warn!(operation, "storage call exceeded deadline");
                Err(TagError::Aborted(format!("{} exceeded deadline", operation)))
            }
        }
    }
}

impl<B: TagBackend + ?Sized> Clone for TagRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            policy: self.policy.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
