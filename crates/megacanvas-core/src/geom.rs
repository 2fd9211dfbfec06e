//! Small geometry value types shared by the pool and its callers.

use serde::{Deserialize, Serialize};

/// Inclusive bounds on requestable surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min: u32,
    pub max: u32,
}

impl SizeBounds {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// True when both dimensions lie within `[min, max]`.
    pub fn contains(&self, width: u32, height: u32) -> bool {
        (self.min..=self.max).contains(&width) && (self.min..=self.max).contains(&height)
    }
}

/// Sub-rectangle of a surface that the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}
