#![forbid(unsafe_code)]
//! megacanvas-device: surface backends that do not need a GPU.
//!
//! [`HeadlessDevice`] behaves like a graphics device from the pool's point of
//! view (sized surfaces with a footprint that can be disposed behind the
//! pool's back) and records enough to check how the pool drives it.

pub mod headless;

pub use headless::{footprint, DeviceStats, HeadlessDevice, HeadlessSurface};
