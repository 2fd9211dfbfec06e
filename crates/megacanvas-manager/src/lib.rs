#![forbid(unsafe_code)]
//! megacanvas-manager: the single entry point UI code uses for scratch surfaces.
//!
//! The [`CanvasManager`] owns one pool per [`Flavor`] (plus optional named
//! pools), shares the global size bounds between them, and drives their
//! eviction once per rendered frame via [`CanvasManager::tick`].
//!
//! [`Flavor`]: megacanvas_core::Flavor

pub mod diagnostics;
pub mod manager;

pub use diagnostics::{human_bytes, ManagerDiagnostics, PoolDiagnostics};
pub use manager::{CanvasManager, ManagerError};
pub use megacanvas_pool::{PoolStats, Region, SurfacePool};
