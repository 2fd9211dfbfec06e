#![forbid(unsafe_code)]
//! megacanvas: pooled scratch surfaces for immediate-mode rendering.
//!
//! Facade over the workspace crates. Most hosts only need
//! [`CanvasManager`]; the pool, device and core crates are re-exported for
//! backends and tests.

pub use megacanvas_core as core;
pub use megacanvas_device as device;
pub use megacanvas_manager as manager;
pub use megacanvas_pool as pool;

pub use megacanvas_core::{CanvasConfig, Flavor, PoolPolicy, Surface, SurfaceDesc, SurfaceDevice};
pub use megacanvas_manager::{CanvasManager, ManagerDiagnostics, ManagerError};
pub use megacanvas_pool::{PoolStats, Region, SurfacePool};
