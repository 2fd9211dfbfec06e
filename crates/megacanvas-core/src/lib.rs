#![forbid(unsafe_code)]
//! megacanvas-core: interfaces shared by every megacanvas crate.
//!
//! This crate only defines *what* a surface and a surface factory look like,
//! plus the IDs and configuration that flow between crates. The pool, its
//! eviction policy and the manager live downstream.

pub mod config;
pub mod error;
pub mod geom;
pub mod id;
pub mod prelude;
pub mod surface;

pub use config::{CanvasConfig, PoolPolicy};
pub use error::{Error, Result};
pub use geom::{RegionRect, SizeBounds};
pub use id::SurfaceId;
pub use surface::{Flavor, Surface, SurfaceDesc, SurfaceDevice};
