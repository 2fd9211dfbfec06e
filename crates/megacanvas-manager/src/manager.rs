//! CanvasManager: owns the per-flavor pools and drives them once per frame.

use std::sync::Arc;

use thiserror::Error;

use megacanvas_core::{CanvasConfig, Flavor, SurfaceDevice};
use megacanvas_pool::{Region, SurfacePool};

use crate::diagnostics::{ManagerDiagnostics, PoolDiagnostics};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("configuration: {0}")]
    Config(#[from] megacanvas_core::Error),
    #[error("pool: {0}")]
    Pool(#[from] megacanvas_pool::Error),
    #[error("a pool named '{0}' already exists")]
    DuplicatePool(String),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

/// Manager owns the device handle, the global bounds and every pool.
///
/// `get`, `tick`, `dispose` and `flush` belong on the render thread. Regions
/// it hands out may be released from any thread.
pub struct CanvasManager<D: SurfaceDevice> {
    device: Arc<D>,
    config: CanvasConfig,
    standard: SurfacePool<D>,
    multisampled: SurfacePool<D>,
    named: Vec<SurfacePool<D>>,
    frame: u64,
}

impl<D: SurfaceDevice> CanvasManager<D> {
    pub fn new(device: Arc<D>, config: CanvasConfig) -> Result<Self> {
        config.validate()?;
        let standard = SurfacePool::new(
            Flavor::Standard.label(),
            Arc::clone(&device),
            0,
            config.bounds(),
            config.pool,
        )?;
        let multisampled = SurfacePool::new(
            Flavor::Multisampled.label(),
            Arc::clone(&device),
            config.multisample_count,
            config.bounds(),
            config.pool,
        )?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            min = config.min_size,
            max = config.max_size,
            samples = config.multisample_count,
            capacity = config.pool.capacity,
            "canvas manager created"
        );

        Ok(Self {
            device,
            config,
            standard,
            multisampled,
            named: Vec::new(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Frames ticked so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pool(&self, flavor: Flavor) -> &SurfacePool<D> {
        match flavor {
            Flavor::Standard => &self.standard,
            Flavor::Multisampled => &self.multisampled,
        }
    }

    /// Register an extra pool sharing the manager's bounds and policy, e.g. a
    /// dedicated cache pool for a single widget family.
    pub fn add_pool(&mut self, name: &str, multisampled: bool) -> Result<SurfacePool<D>> {
        let taken = Flavor::ALL.iter().any(|f| f.label() == name)
            || self.named.iter().any(|p| p.name() == name);
        if taken {
            return Err(ManagerError::DuplicatePool(name.to_string()));
        }
        let samples = if multisampled {
            self.config.multisample_count
        } else {
            0
        };
        let pool = SurfacePool::new(
            name,
            Arc::clone(&self.device),
            samples,
            self.config.bounds(),
            self.config.pool,
        )?;
        self.named.push(pool.clone());
        Ok(pool)
    }

    pub fn named(&self, name: &str) -> Option<&SurfacePool<D>> {
        self.named.iter().find(|p| p.name() == name)
    }

    fn pools(&self) -> impl Iterator<Item = &SurfacePool<D>> {
        [&self.standard, &self.multisampled]
            .into_iter()
            .chain(self.named.iter())
    }

    /// Check out a surface of at least `width x height` from the `flavor` pool.
    /// `Ok(None)` means the size is outside `[min_size, max_size]`.
    pub fn get(&self, flavor: Flavor, width: u32, height: u32) -> Result<Option<Region<D>>> {
        Ok(self.pool(flavor).get(width, height)?)
    }

    /// Once per rendered frame.
    pub fn tick(&mut self) {
        self.frame += 1;
        for pool in self.pools() {
            pool.tick();
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            frame = self.frame,
            total_bytes = self.total_memory(),
            idle = self.pools().map(|p| p.idle_count()).sum::<usize>(),
            used = self.pools().map(|p| p.used_count()).sum::<usize>(),
            "frame ticked"
        );
    }

    /// Destroy parked surfaces in every pool without advancing the frame.
    pub fn flush(&self) {
        for pool in self.pools() {
            pool.flush();
        }
    }

    /// Shut every pool down. Also runs when the manager is dropped.
    pub fn dispose(&self) {
        for pool in self.pools() {
            pool.dispose();
        }
    }

    /// Device bytes held across all pools.
    pub fn total_memory(&self) -> u64 {
        self.pools().map(|p| p.total_memory()).sum()
    }

    pub fn diagnostics(&self) -> ManagerDiagnostics {
        let pools = [
            (Flavor::Standard.label().to_string(), &self.standard),
            (Flavor::Multisampled.label().to_string(), &self.multisampled),
        ]
        .into_iter()
        .chain(
            self.named
                .iter()
                .map(|p| (p.name().to_ascii_uppercase(), p)),
        )
        .map(|(label, p)| PoolDiagnostics {
            name: p.name().to_string(),
            label,
            multisampled: p.is_multisampled(),
            stats: p.stats(),
        })
        .collect();
        ManagerDiagnostics {
            frame: self.frame,
            pools,
        }
    }
}

// Pools hold device surfaces; the manager lives and dies on the render
// thread, so dropping it is the last chance to hand them back.
impl<D: SurfaceDevice> Drop for CanvasManager<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}
