use std::time::Duration;
use tokio::time::Instant;

use super::TenantId;

/// Per-call context carried into every registry operation.
///
/// The tenant scopes all lookups and creations; the optional deadline
/// bounds every storage call made on behalf of this request.
#[derive(Debug, Clone)]
pub struct TagCtx {
    /// Tenant identifier for multi-tenant isolation
    pub tenant_id: TenantId,

    /// Optional trace ID for distributed tracing
    pub trace_id: Option<String>,

    /// Pending storage calls abort once this instant passes
    pub deadline: Option<Instant>,
}

impl TagCtx {
    /// Create a new context for the given tenant
    pub fn new<T: Into<TenantId>>(tenant_id: T) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            trace_id: None,
            deadline: None,
        }
    }

    /// Add a trace ID for distributed tracing
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let ctx = TagCtx::new("acme").with_trace_id("trace-1");
        assert_eq!(ctx.tenant_id, TenantId::from("acme"));
        assert_eq!(ctx.trace_id.as_deref(), Some("trace-1"));
        assert!(ctx.deadline.is_none());
        assert!(!ctx.is_expired());
    }

    #[tokio::test]
    async fn elapsed_deadline_is_expired() {
        let ctx = TagCtx::new("acme").with_deadline(Instant::now());
        assert!(ctx.is_expired());
    }
}
