//! The surface pool: smallest-fit reuse, padded allocation, and the
//! age / squish / burst-cull eviction policy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use megacanvas_core::{
    PoolPolicy, RegionRect, SizeBounds, Surface, SurfaceDesc, SurfaceDevice, SurfaceId,
};

use crate::error::{Error, Result};
use crate::region::Region;
use crate::slots::{EvictReason, Pooled, SlotTable};
use crate::stats::PoolStats;
use crate::tracking::PeakTracker;

/// Size a fresh surface is created with for a request of `requested` pixels:
/// the next multiple of `padding` strictly above `requested`, clamped to `max`.
///
/// Nearby request sizes land in the same bucket, so a surface allocated for
/// one of them is reusable by the others.
pub fn padded_extent(requested: u32, padding: u32, max: u32) -> u32 {
    let padding = padding.max(1);
    (requested / padding)
        .saturating_add(1)
        .saturating_mul(padding)
        .min(max)
}

#[derive(Debug, Default)]
struct Counters {
    allocations: u64,
    reuses: u64,
    aged_out: u64,
    squished: u64,
    burst_culled: u64,
    device_lost: u64,
}

/// Everything the pool mutex guards.
struct PoolState<S> {
    slots: SlotTable<S>,
    used: HashMap<SurfaceId, u64>,
    used_memory: u64,
    total_memory: u64,
    frame: u64,
    since_squish: u32,
    cull_triggered: bool,
    disposed: bool,
    // Evicted outside the render thread; destroyed by the next get/tick/flush.
    graveyard: Vec<S>,
    counters: Counters,
}

impl<S: Surface> PoolState<S> {
    /// Account for a surface leaving the pool for good and park it for destruction.
    fn retire(&mut self, entry: Pooled<S>) {
        self.total_memory = self.total_memory.saturating_sub(entry.bytes);
        self.graveyard.push(entry.surface);
    }

    /// Account for a surface the backend already disposed. Nothing left to destroy.
    fn forget(&mut self, entry: Pooled<S>) {
        self.total_memory = self.total_memory.saturating_sub(entry.bytes);
        self.counters.device_lost += 1;
        #[cfg(feature = "tracing")]
        tracing::warn!(id = %entry.id, bytes = entry.bytes, "surface disposed by device");
    }

    fn settle(&mut self, evicted: Vec<(Pooled<S>, EvictReason)>) {
        for (entry, reason) in evicted {
            match reason {
                EvictReason::DeviceLost => {
                    self.forget(entry);
                    continue;
                }
                EvictReason::Aged => self.counters.aged_out += 1,
                EvictReason::Squished => self.counters.squished += 1,
            }
            self.retire(entry);
        }
    }
}

pub(crate) struct Shared<D: SurfaceDevice> {
    name: String,
    device: Arc<D>,
    sample_count: u32,
    bounds: SizeBounds,
    policy: PoolPolicy,
    next_id: AtomicU64,
    peak: PeakTracker,
    state: Mutex<PoolState<D::Surface>>,
}

impl<D: SurfaceDevice> Shared<D> {
    fn lock(&self) -> MutexGuard<'_, PoolState<D::Surface>> {
        // Every critical section leaves the state consistent before any
        // point that can panic, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn destroy_all(&self, doomed: Vec<D::Surface>) {
        for surface in doomed {
            self.device.destroy_surface(surface);
        }
    }

    /// Called with the lock released and the state already made consistent:
    /// panics in debug builds, logs in release builds.
    fn invariant_broken(&self, err: Error) {
        #[cfg(feature = "tracing")]
        tracing::error!(pool = %self.name, error = %err, "pool invariant violated");
        debug_assert!(false, "pool '{}': {err}", self.name);
    }

    /// Return a checked-out surface. Safe to call from any thread: the device
    /// is never touched here.
    pub(crate) fn free(&self, entry: Pooled<D::Surface>) {
        let mut st = self.lock();

        let Some(bytes) = st.used.remove(&entry.id) else {
            let id = entry.id;
            st.graveyard.push(entry.surface);
            drop(st);
            self.invariant_broken(Error::invariant(format!(
                "freed surface {id} is not tracked as used"
            )));
            return;
        };
        debug_assert!(st.used_memory >= bytes, "used memory underflow");
        st.used_memory = st.used_memory.saturating_sub(bytes);

        if entry.surface.is_disposed() {
            st.forget(entry);
            return;
        }

        if st.disposed {
            #[cfg(feature = "tracing")]
            tracing::trace!(pool = %self.name, id = %entry.id, "released after dispose");
            st.retire(entry);
            return;
        }

        if st.cull_triggered {
            st.counters.burst_culled += 1;
            st.retire(entry);
            return;
        }

        if st.slots.is_full() {
            #[cfg(feature = "tracing")]
            tracing::debug!(pool = %self.name, id = %entry.id, "idle table full, burst cull");
            st.cull_triggered = true;
            st.counters.burst_culled += 1;
            st.retire(entry);
            return;
        }

        if let Err(entry) = st.slots.insert(entry) {
            let (alive, capacity) = (st.slots.alive(), st.slots.capacity());
            st.cull_triggered = true;
            st.counters.burst_culled += 1;
            st.retire(entry);
            drop(st);
            self.invariant_broken(Error::invariant(format!(
                "no empty slot although {alive} of {capacity} slots are alive"
            )));
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(pool = %self.name, idle = st.slots.alive(), "surface returned to pool");
    }
}

/// Pool of reusable surfaces of one flavor.
///
/// Cloning is cheap; clones share the same table.
pub struct SurfacePool<D: SurfaceDevice> {
    shared: Arc<Shared<D>>,
}

impl<D: SurfaceDevice> Clone for SurfacePool<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: SurfaceDevice> SurfacePool<D> {
    /// Create a pool. `sample_count == 0` makes a non-multisampled pool.
    pub fn new(
        name: impl Into<String>,
        device: Arc<D>,
        sample_count: u32,
        bounds: SizeBounds,
        policy: PoolPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        if bounds.min == 0 || bounds.min > bounds.max {
            return Err(megacanvas_core::Error::Config(format!(
                "invalid size bounds [{}, {}]",
                bounds.min, bounds.max
            ))
            .into());
        }
        Ok(Self {
            shared: Arc::new(Shared {
                name: name.into(),
                device,
                sample_count,
                bounds,
                policy,
                next_id: AtomicU64::new(1),
                peak: PeakTracker::new(),
                state: Mutex::new(PoolState {
                    slots: SlotTable::with_capacity(policy.capacity),
                    used: HashMap::new(),
                    used_memory: 0,
                    total_memory: 0,
                    frame: 0,
                    since_squish: 0,
                    cull_triggered: false,
                    disposed: false,
                    graveyard: Vec::new(),
                    counters: Counters::default(),
                }),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn sample_count(&self) -> u32 {
        self.shared.sample_count
    }

    pub fn is_multisampled(&self) -> bool {
        self.shared.sample_count > 1
    }

    pub fn bounds(&self) -> SizeBounds {
        self.shared.bounds
    }

    pub fn policy(&self) -> PoolPolicy {
        self.shared.policy
    }

    /// Check out a surface covering at least `width x height`.
    ///
    /// Returns `Ok(None)` when either dimension is outside the pool's bounds;
    /// nothing about the pool changes in that case. Render thread only.
    pub fn get(&self, width: u32, height: u32) -> Result<Option<Region<D>>> {
        let shared = &self.shared;
        if !shared.bounds.contains(width, height) {
            #[cfg(feature = "tracing")]
            tracing::trace!(pool = %shared.name, width, height, "request outside bounds");
            return Ok(None);
        }

        let (reused, doomed) = {
            let mut st = shared.lock();
            let doomed = std::mem::take(&mut st.graveyard);
            let mut reused = None;
            while let Some(index) = st.slots.smallest_fit(width, height) {
                let Some(entry) = st.slots.take(index) else {
                    break;
                };
                if entry.surface.is_disposed() {
                    st.forget(entry);
                    continue;
                }
                st.used.insert(entry.id, entry.bytes);
                st.used_memory += entry.bytes;
                st.counters.reuses += 1;
                reused = Some(entry);
                break;
            }
            (reused, doomed)
        };
        shared.destroy_all(doomed);

        let entry = match reused {
            Some(entry) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    pool = %shared.name,
                    id = %entry.id,
                    width,
                    height,
                    "reusing pooled surface"
                );
                entry
            }
            None => self.allocate(width, height)?,
        };

        Ok(Some(Region::new(
            Arc::clone(shared),
            entry,
            RegionRect::sized(width, height),
        )))
    }

    fn allocate(&self, width: u32, height: u32) -> Result<Pooled<D::Surface>> {
        let shared = &self.shared;
        let padding = shared.policy.padding;
        let desc = SurfaceDesc::new(
            padded_extent(width, padding, shared.bounds.max),
            padded_extent(height, padding, shared.bounds.max),
            shared.sample_count,
        );

        // Created outside the lock; the surface belongs to no container until
        // it is recorded as used below.
        let surface = shared
            .device
            .create_surface(desc)
            .map_err(|source| Error::Alloc {
                pool: shared.name.clone(),
                width: desc.width,
                height: desc.height,
                source,
            })?;
        let bytes = surface.memory_bytes();
        let id = SurfaceId::new(shared.next_id.fetch_add(1, Ordering::Relaxed));

        let total = {
            let mut st = shared.lock();
            st.used.insert(id, bytes);
            st.used_memory += bytes;
            st.total_memory += bytes;
            st.counters.allocations += 1;
            st.total_memory
        };
        shared.peak.record(total);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            pool = %shared.name,
            %id,
            width = desc.width,
            height = desc.height,
            bytes,
            "allocated surface"
        );

        Ok(Pooled::new(id, surface, bytes))
    }

    /// Advance one frame: age idle surfaces and, every `squish_interval`
    /// frames or right after a burst cull, squish the table down to
    /// `cull_target` slots. Render thread only.
    pub fn tick(&self) {
        let shared = &self.shared;
        let policy = shared.policy;

        let doomed = {
            let mut st = shared.lock();
            st.frame += 1;
            st.since_squish = st.since_squish.saturating_add(1);
            let squish = st.since_squish >= policy.squish_interval || st.cull_triggered;

            let mut evicted = Vec::new();
            st.slots.age_out(policy.max_age, &mut evicted);
            if squish {
                st.cull_triggered = false;
                st.since_squish = 0;
                st.slots.squish(policy.cull_target, &mut evicted);
            }

            #[cfg(feature = "tracing")]
            if !evicted.is_empty() {
                tracing::debug!(
                    pool = %shared.name,
                    frame = st.frame,
                    squish,
                    evicted = evicted.len(),
                    idle = st.slots.alive(),
                    "eviction pass"
                );
            }

            st.settle(evicted);
            std::mem::take(&mut st.graveyard)
        };
        shared.destroy_all(doomed);
    }

    /// Shut the pool down: destroy every idle and parked surface. Surfaces
    /// still held by regions stay accounted as used; releasing them afterwards
    /// destroys them instead of pooling them. `get` keeps working, but nothing
    /// is pooled again.
    ///
    /// Dropping a pool does not dispose it; the owner calls this on the render
    /// thread before letting go.
    pub fn dispose(&self) {
        let shared = &self.shared;
        let doomed = {
            let mut st = shared.lock();
            for entry in st.slots.drain() {
                if entry.surface.is_disposed() {
                    st.forget(entry);
                } else {
                    st.retire(entry);
                }
            }
            st.since_squish = 0;
            st.cull_triggered = false;
            st.disposed = true;
            std::mem::take(&mut st.graveyard)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %shared.name, destroyed = doomed.len(), "pool disposed");

        shared.destroy_all(doomed);
    }

    /// Destroy surfaces parked by releases since the last render-thread call.
    pub fn flush(&self) {
        let doomed = std::mem::take(&mut self.shared.lock().graveyard);
        self.shared.destroy_all(doomed);
    }

    pub fn stats(&self) -> PoolStats {
        let st = self.shared.lock();
        PoolStats {
            capacity: st.slots.capacity(),
            idle: st.slots.alive(),
            used: st.used.len(),
            used_bytes: st.used_memory,
            total_bytes: st.total_memory,
            peak_total_bytes: self.shared.peak.peak(),
            frame: st.frame,
            pending_destroy: st.graveyard.len(),
            cull_pending: st.cull_triggered,
            disposed: st.disposed,
            allocations: st.counters.allocations,
            reuses: st.counters.reuses,
            aged_out: st.counters.aged_out,
            squished: st.counters.squished,
            burst_culled: st.counters.burst_culled,
            device_lost: st.counters.device_lost,
        }
    }

    pub fn idle_count(&self) -> usize {
        self.shared.lock().slots.alive()
    }

    pub fn used_count(&self) -> usize {
        self.shared.lock().used.len()
    }

    pub fn used_memory(&self) -> u64 {
        self.shared.lock().used_memory
    }

    pub fn total_memory(&self) -> u64 {
        self.shared.lock().total_memory
    }

    /// Sum of idle footprints, computed from the table itself.
    pub fn idle_memory(&self) -> u64 {
        self.shared.lock().slots.idle_bytes()
    }

    /// IDs of idle surfaces in slot order.
    pub fn idle_ids(&self) -> Vec<SurfaceId> {
        self.shared.lock().slots.ids()
    }

    /// True when `total == used + idle` holds, observed under one lock.
    pub fn accounting_consistent(&self) -> bool {
        let st = self.shared.lock();
        st.total_memory == st.used_memory + st.slots.idle_bytes()
    }
}
