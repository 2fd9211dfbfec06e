//! Convenient re-exports for downstream crates.

pub use crate::config::{CanvasConfig, PoolPolicy};
pub use crate::error::{Error, Result};
pub use crate::geom::{RegionRect, SizeBounds};
pub use crate::id::SurfaceId;
pub use crate::surface::{Flavor, Surface, SurfaceDesc, SurfaceDevice};
