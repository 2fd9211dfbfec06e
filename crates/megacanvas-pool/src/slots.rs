//! Fixed-capacity table of idle surfaces.
//!
//! Lookups are linear scans. At the capacities the pool runs with (tens of
//! slots) that beats maintaining a size index, and it keeps "first empty slot"
//! and "keep the lowest indices" trivially cheap to express.

use megacanvas_core::{Surface, SurfaceId};

/// A surface together with the bookkeeping captured when it was allocated.
///
/// `bytes` is the footprint the pool accounted for; every later subtraction
/// uses this value rather than asking the surface again.
#[derive(Debug)]
pub struct Pooled<S> {
    pub(crate) id: SurfaceId,
    pub(crate) surface: S,
    pub(crate) bytes: u64,
}

impl<S: Surface> Pooled<S> {
    pub fn new(id: SurfaceId, surface: S, bytes: u64) -> Self {
        Self { id, surface, bytes }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Why an idle surface left the table without being reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// Sat idle for `max_age` ticks.
    Aged,
    /// Beyond `cull_target` during a squish pass.
    Squished,
    /// Already disposed by the backend.
    DeviceLost,
}

#[derive(Debug)]
struct Slot<S> {
    entry: Option<Pooled<S>>,
    // Cached so the fit scan never has to call into the surface.
    width: u32,
    height: u32,
    age: u32,
}

impl<S> Slot<S> {
    fn empty() -> Self {
        Self {
            entry: None,
            width: 0,
            height: 0,
            age: 0,
        }
    }
}

#[derive(Debug)]
pub struct SlotTable<S> {
    slots: Box<[Slot<S>]>,
    alive: usize,
}

impl<S: Surface> SlotTable<S> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::empty()).collect(),
            alive: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn is_full(&self) -> bool {
        self.alive >= self.slots.len()
    }

    /// Sum of the accounted footprints of every idle surface.
    pub fn idle_bytes(&self) -> u64 {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .map(|p| p.bytes)
            .sum()
    }

    /// Index of the smallest-area idle surface that covers `width x height`.
    /// Ties keep the first slot found.
    pub fn smallest_fit(&self, width: u32, height: u32) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.entry.is_none() || slot.width < width || slot.height < height {
                continue;
            }
            let area = u64::from(slot.width) * u64::from(slot.height);
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((i, area));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Remove the surface at `index`, leaving the slot empty.
    pub fn take(&mut self, index: usize) -> Option<Pooled<S>> {
        let slot = self.slots.get_mut(index)?;
        let entry = slot.entry.take()?;
        *slot = Slot::empty();
        self.alive -= 1;
        Some(entry)
    }

    /// Store `entry` in the first empty slot with a fresh age.
    /// Hands the entry back if no slot is empty.
    pub fn insert(&mut self, entry: Pooled<S>) -> Result<usize, Pooled<S>> {
        let Some(index) = self.slots.iter().position(|s| s.entry.is_none()) else {
            return Err(entry);
        };
        self.slots[index] = Slot {
            width: entry.surface.width(),
            height: entry.surface.height(),
            age: 0,
            entry: Some(entry),
        };
        self.alive += 1;
        Ok(index)
    }

    /// Age every idle surface by one frame. Surfaces that reach `max_age`, or
    /// that the backend already disposed, are moved into `evicted`.
    pub fn age_out(&mut self, max_age: u32, evicted: &mut Vec<(Pooled<S>, EvictReason)>) {
        for i in (0..self.slots.len()).rev() {
            let slot = &mut self.slots[i];
            let Some(entry) = slot.entry.as_ref() else {
                continue;
            };
            let reason = if entry.surface.is_disposed() {
                EvictReason::DeviceLost
            } else {
                slot.age = slot.age.saturating_add(1);
                if slot.age < max_age {
                    continue;
                }
                EvictReason::Aged
            };
            if let Some(entry) = self.take(i) {
                evicted.push((entry, reason));
            }
        }
    }

    /// Evict every occupied slot at index `keep` or above.
    pub fn squish(&mut self, keep: usize, evicted: &mut Vec<(Pooled<S>, EvictReason)>) {
        for i in (keep..self.slots.len()).rev() {
            if let Some(entry) = self.take(i) {
                evicted.push((entry, EvictReason::Squished));
            }
        }
    }

    /// Empty the whole table.
    pub fn drain(&mut self) -> Vec<Pooled<S>> {
        (0..self.slots.len()).filter_map(|i| self.take(i)).collect()
    }

    /// Age of the surface at `index`, if occupied.
    pub fn age_of(&self, index: usize) -> Option<u32> {
        self.slots
            .get(index)
            .filter(|s| s.entry.is_some())
            .map(|s| s.age)
    }

    /// Desynchronize the alive count from the slots, to drive the pool into
    /// its "no empty slot" fallback.
    #[cfg(test)]
    pub(crate) fn force_alive(&mut self, alive: usize) {
        self.alive = alive;
    }

    /// IDs of the idle surfaces, in slot order.
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref().map(|p| p.id))
            .collect()
    }
}
