use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Lock-free counters for the sync pipeline.
#[derive(Debug, Default)]
pub struct SyncStats {
    mutations: AtomicU64,
    reloads_requested: AtomicU64,
    reloads_succeeded: AtomicU64,
    reloads_failed: AtomicU64,
    extension_invocations: AtomicU64,
    lookups: AtomicU64,
    lookups_not_found: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatsSnapshot {
    pub mutations: u64,
    pub reloads_requested: u64,
    pub reloads_succeeded: u64,
    pub reloads_failed: u64,
    pub extension_invocations: u64,
    pub lookups: u64,
    pub lookups_not_found: u64,
}

impl SyncStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_mutations(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reloads_requested(&self) {
        self.reloads_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reloads_succeeded(&self) {
        self.reloads_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reloads_failed(&self) {
        self.reloads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_extension_invocations(&self) {
        self.extension_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookups_not_found(&self) {
        self.lookups_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            mutations: self.mutations.load(Ordering::Relaxed),
            reloads_requested: self.reloads_requested.load(Ordering::Relaxed),
            reloads_succeeded: self.reloads_succeeded.load(Ordering::Relaxed),
            reloads_failed: self.reloads_failed.load(Ordering::Relaxed),
            extension_invocations: self.extension_invocations.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookups_not_found: self.lookups_not_found.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            "Sync stats: mutations={} reloads={}/{} ok ({} failed) invocations={} lookups={} ({} unknown)",
            s.mutations,
            s.reloads_succeeded,
            s.reloads_requested,
            s.reloads_failed,
            s.extension_invocations,
            s.lookups,
            s.lookups_not_found
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = SyncStats::new();
        stats.inc_mutations();
        stats.inc_reloads_requested();
        stats.inc_reloads_requested();
        stats.inc_reloads_failed();

        let s = stats.snapshot();
        assert_eq!(s.mutations, 1);
        assert_eq!(s.reloads_requested, 2);
        assert_eq!(s.reloads_failed, 1);
        assert_eq!(s.reloads_succeeded, 0);
    }
}
