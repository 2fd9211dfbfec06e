#![forbid(unsafe_code)]
//! megacanvas-pool: scratch-surface pool and its eviction policy.
//!
//! A [`SurfacePool`] owns a fixed-capacity [`SlotTable`] of idle surfaces and
//! hands out [`Region`] handles. Every mutation of the table, the used-set and
//! the memory counters happens under the pool's single mutex, so releases from
//! worker threads can race the render thread's `get`/`tick` safely.
//!
//! Device calls (create/destroy) only happen from `get`, `tick`, `dispose` and
//! `flush`, which the host calls on its render thread.

pub mod error;
pub mod pool;
pub mod region;
pub mod slots;
pub mod stats;
pub mod tracking;

pub use error::{Error, Result};
pub use pool::{padded_extent, SurfacePool};
pub use region::Region;
pub use slots::{EvictReason, Pooled, SlotTable};
pub use stats::PoolStats;
pub use tracking::PeakTracker;
