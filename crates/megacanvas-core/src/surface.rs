//! Abstract surface and surface-factory interfaces.
//!
//! Concrete backends (a GPU device, or the headless device in
//! `megacanvas-device`) implement these. The pool never looks inside a
//! surface beyond its size, footprint and disposal state.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which pool a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Standard,
    Multisampled,
}

impl Flavor {
    pub const ALL: [Flavor; 2] = [Flavor::Standard, Flavor::Multisampled];

    /// Short label used by diagnostics overlays.
    pub fn label(self) -> &'static str {
        match self {
            Flavor::Standard => "MAIN",
            Flavor::Multisampled => "MSAA",
        }
    }
}

/// Parameters for creating a surface. `sample_count == 0` means no MSAA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl SurfaceDesc {
    pub const fn new(width: u32, height: u32, sample_count: u32) -> Self {
        Self {
            width,
            height,
            sample_count,
        }
    }

    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

/// A device-backed 2D render target with fixed pixel dimensions.
///
/// Values are moved between the pool and region handles; exactly one owner
/// exists at any time.
pub trait Surface: Send + 'static {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn sample_count(&self) -> u32;
    /// Bytes of device memory this surface occupies.
    fn memory_bytes(&self) -> u64;
    /// True once the backend discarded the surface (e.g. device reset).
    fn is_disposed(&self) -> bool;
}

/// Factory that creates and destroys surfaces.
///
/// Pools only call into the device from the render thread (`get`, `tick`,
/// `dispose`, `flush`). Releases coming from worker threads park their
/// surfaces until one of those calls runs.
pub trait SurfaceDevice: Send + Sync + 'static {
    type Surface: Surface;

    fn create_surface(&self, desc: SurfaceDesc) -> Result<Self::Surface>;

    fn destroy_surface(&self, surface: Self::Surface);
}
