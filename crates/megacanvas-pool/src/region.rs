//! Region handle: exclusive, time-bounded use of a pooled surface.
//!
//! The handle owns the surface value. Releasing consumes the handle, so a
//! region cannot be released twice or used after release. Dropping a region
//! releases it as well.

use std::fmt;
use std::sync::Arc;

use megacanvas_core::{RegionRect, Surface, SurfaceDevice, SurfaceId};

use crate::pool::Shared;
use crate::slots::Pooled;

pub struct Region<D: SurfaceDevice> {
    pool: Arc<Shared<D>>,
    // Always `Some` until drop hands the surface back.
    entry: Option<Pooled<D::Surface>>,
    rect: RegionRect,
}

impl<D: SurfaceDevice> Region<D> {
    pub(crate) fn new(pool: Arc<Shared<D>>, entry: Pooled<D::Surface>, rect: RegionRect) -> Self {
        Self {
            pool,
            entry: Some(entry),
            rect,
        }
    }

    fn entry(&self) -> &Pooled<D::Surface> {
        self.entry.as_ref().expect("region holds its surface until dropped")
    }

    /// The backing surface. Usually larger than [`Region::rect`].
    pub fn surface(&self) -> &D::Surface {
        &self.entry().surface
    }

    pub fn surface_mut(&mut self) -> &mut D::Surface {
        &mut self
            .entry
            .as_mut()
            .expect("region holds its surface until dropped")
            .surface
    }

    /// The sub-rectangle that was requested.
    pub fn rect(&self) -> RegionRect {
        self.rect
    }

    pub fn id(&self) -> SurfaceId {
        self.entry().id
    }

    /// Actual `(width, height)` of the backing surface.
    pub fn surface_size(&self) -> (u32, u32) {
        let s = self.surface();
        (s.width(), s.height())
    }

    /// Bytes the pool accounted for this surface.
    pub fn bytes(&self) -> u64 {
        self.entry().bytes
    }

    /// Hand the surface back to its pool. May be called from any thread.
    pub fn release(self) {
        drop(self);
    }
}

impl<D: SurfaceDevice> Drop for Region<D> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.free(entry);
        }
    }
}

impl<D: SurfaceDevice> fmt::Debug for Region<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Region");
        if let Some(entry) = &self.entry {
            d.field("id", &entry.id)
                .field("surface", &(entry.surface.width(), entry.surface.height()))
                .field("bytes", &entry.bytes);
        }
        d.field("rect", &self.rect).finish()
    }
}
