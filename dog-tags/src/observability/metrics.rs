use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for registry activity
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    lookups: AtomicU64,
    tags_created: AtomicU64,
    tags_reused: AtomicU64,
    uniqueness_conflicts: AtomicU64,
    rollbacks: AtomicU64,
    duplicate_failures: AtomicU64,
    aborted: AtomicU64,
}

/// Point-in-time copy of [`RegistryMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub tags_created: u64,
    pub tags_reused: u64,
    pub uniqueness_conflicts: u64,
    pub rollbacks: u64,
    pub duplicate_failures: u64,
    pub aborted: u64,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_tags_created(&self) {
        self.tags_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_tags_reused(&self) {
        self.tags_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_uniqueness_conflicts(&self) {
        self.uniqueness_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rollbacks(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicate_failures(&self) {
        self.duplicate_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tags_created(&self) -> u64 {
        self.tags_created.load(Ordering::Relaxed)
    }

    pub fn uniqueness_conflicts(&self) -> u64 {
        self.uniqueness_conflicts.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            tags_created: self.tags_created.load(Ordering::Relaxed),
            tags_reused: self.tags_reused.load(Ordering::Relaxed),
            uniqueness_conflicts: self.uniqueness_conflicts.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            duplicate_failures: self.duplicate_failures.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = RegistryMetrics::new();
        metrics.increment_tags_created();
        metrics.increment_tags_created();
        metrics.increment_uniqueness_conflicts();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tags_created, 2);
        assert_eq!(snapshot.uniqueness_conflicts, 1);
        assert_eq!(snapshot.duplicate_failures, 0);
    }
}
