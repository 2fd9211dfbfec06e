//! Read-only pool snapshot for diagnostics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: usize,
    /// Occupied idle slots.
    pub idle: usize,
    /// Surfaces currently checked out through regions.
    pub used: usize,
    pub used_bytes: u64,
    /// Idle + used bytes; everything allocated and not yet destroyed.
    pub total_bytes: u64,
    pub peak_total_bytes: u64,
    /// Ticks seen so far.
    pub frame: u64,
    /// Evicted surfaces waiting for a render-thread call to be destroyed.
    pub pending_destroy: usize,
    pub cull_pending: bool,
    /// Set by `dispose`; releases are destroyed instead of pooled from then on.
    pub disposed: bool,

    pub allocations: u64,
    pub reuses: u64,
    pub aged_out: u64,
    pub squished: u64,
    pub burst_culled: u64,
    pub device_lost: u64,
}

impl PoolStats {
    /// Bytes held by idle surfaces.
    pub fn idle_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}
