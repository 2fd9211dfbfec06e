//! Lightweight peak tracking for pool memory.
//!
//! Keep this optional and cheap. Downstream can wire it to a debug overlay or metrics.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_bytes: AtomicU64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak_bytes: AtomicU64::new(0),
        }
    }

    /// Record a new "total bytes" value; updates peak if higher.
    pub fn record(&self, total_bytes: u64) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while total_bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                total_bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
    }

    pub fn peak(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}
