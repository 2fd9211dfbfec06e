//! In-memory surface device.
//!
//! Surfaces carry no pixel storage; only their dimensions and footprint are
//! modelled. The device keeps a registry of live surfaces so it can simulate
//! a device reset and so tests can verify every creation is paired with
//! exactly one destruction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde::{Deserialize, Serialize};

use megacanvas_core::{Error, Result, Surface, SurfaceDesc, SurfaceDevice};

const BYTES_PER_PIXEL: u64 = 4;

#[derive(Debug)]
pub struct HeadlessSurface {
    serial: u64,
    width: u32,
    height: u32,
    sample_count: u32,
    disposed: Arc<AtomicBool>,
}

impl HeadlessSurface {
    /// Device-wide creation order, starting at 1.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl Surface for HeadlessSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn memory_bytes(&self) -> u64 {
        footprint(self.width, self.height, self.sample_count)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Bytes a `width x height` surface takes with `sample_count` samples per pixel.
pub fn footprint(width: u32, height: u32, sample_count: u32) -> u64 {
    u64::from(width) * u64::from(height) * BYTES_PER_PIXEL * u64::from(sample_count.max(1))
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub created: u64,
    pub destroyed: u64,
    pub live: usize,
    pub live_bytes: u64,
    /// Destroy calls for surfaces the device did not know (double destroy).
    pub unknown_destroys: u64,
    /// Create/destroy calls made off the bound render thread.
    pub foreign_thread_calls: u64,
}

#[derive(Default)]
struct Registry {
    live: HashMap<u64, (u64, Arc<AtomicBool>)>,
    live_bytes: u64,
    created: u64,
    destroyed: u64,
    unknown_destroys: u64,
}

/// Thread-safe headless device.
pub struct HeadlessDevice {
    registry: Mutex<Registry>,
    next_serial: AtomicU64,
    foreign_thread_calls: AtomicU64,
    render_thread: Mutex<Option<ThreadId>>,
    memory_limit: Option<u64>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            next_serial: AtomicU64::new(1),
            foreign_thread_calls: AtomicU64::new(0),
            render_thread: Mutex::new(None),
            memory_limit: None,
        }
    }

    /// Fail creations that would push live memory past `bytes`.
    pub fn with_memory_limit(bytes: u64) -> Self {
        Self {
            memory_limit: Some(bytes),
            ..Self::new()
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Treat the calling thread as the render thread. Device calls from any
    /// other thread are counted in [`DeviceStats::foreign_thread_calls`].
    pub fn bind_render_thread(&self) {
        *self
            .render_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
    }

    fn check_thread(&self) {
        let bound = *self
            .render_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = bound {
            if id != thread::current().id() {
                self.foreign_thread_calls.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Simulate a device reset: every live surface reports itself disposed
    /// and its memory is gone.
    pub fn reset(&self) -> usize {
        let mut reg = self.registry();
        let n = reg.live.len();
        for (_, (_, flag)) in reg.live.drain() {
            flag.store(true, Ordering::Release);
        }
        reg.live_bytes = 0;
        n
    }

    /// Dispose a single surface behind the pool's back.
    pub fn lose(&self, surface: &HeadlessSurface) -> bool {
        let mut reg = self.registry();
        match reg.live.remove(&surface.serial) {
            Some((bytes, flag)) => {
                flag.store(true, Ordering::Release);
                reg.live_bytes -= bytes;
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> DeviceStats {
        let reg = self.registry();
        DeviceStats {
            created: reg.created,
            destroyed: reg.destroyed,
            live: reg.live.len(),
            live_bytes: reg.live_bytes,
            unknown_destroys: reg.unknown_destroys,
            foreign_thread_calls: self.foreign_thread_calls.load(Ordering::Relaxed),
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceDevice for HeadlessDevice {
    type Surface = HeadlessSurface;

    fn create_surface(&self, desc: SurfaceDesc) -> Result<HeadlessSurface> {
        self.check_thread();
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::Device(format!(
                "zero-sized surface {}x{}",
                desc.width, desc.height
            )));
        }

        let bytes = footprint(desc.width, desc.height, desc.sample_count);
        let mut reg = self.registry();
        if let Some(limit) = self.memory_limit {
            if reg.live_bytes.saturating_add(bytes) > limit {
                return Err(Error::Device(format!(
                    "out of device memory: {} live + {} requested > {} limit",
                    reg.live_bytes, bytes, limit
                )));
            }
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let disposed = Arc::new(AtomicBool::new(false));
        reg.live.insert(serial, (bytes, Arc::clone(&disposed)));
        reg.live_bytes += bytes;
        reg.created += 1;

        Ok(HeadlessSurface {
            serial,
            width: desc.width,
            height: desc.height,
            sample_count: desc.sample_count,
            disposed,
        })
    }

    fn destroy_surface(&self, surface: HeadlessSurface) {
        self.check_thread();
        let mut reg = self.registry();
        match reg.live.remove(&surface.serial) {
            Some((bytes, flag)) => {
                flag.store(true, Ordering::Release);
                reg.live_bytes -= bytes;
                reg.destroyed += 1;
            }
            // Already lost to a reset; nothing to free.
            None if surface.is_disposed() => {}
            None => reg.unknown_destroys += 1,
        }
    }
}
