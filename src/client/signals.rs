use crate::cache::CacheStats;

/// Point-in-time view of the lifecycle registries.
///
/// Facts only. Counts may be stale by the time they are read under concurrency.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSnapshot {
    /// Calls currently registered with the cancellation registry.
    pub inflight: usize,
    /// Fingerprints owned by the cache index, fresh or not.
    pub cached_entries: usize,
    /// Fingerprints with a tracked retry count.
    pub retrying: usize,
    pub cache: CacheStats,
}

impl LifecycleSnapshot {
    pub fn is_idle(&self) -> bool {
        self.inflight == 0 && self.retrying == 0
    }
}
