//! Entity id pool.
//!
//! Entities are bare `u32` indices into the world's fixed slot space. The
//! pool hands out ids in `[0, capacity)`, lowest free id first, and tracks
//! occupancy in a bitset.
//!
//! ## Recycling
//! Released ids return to the free list and may be handed out again by a
//! later acquire. There is no generation counter: a stale id held across a
//! release will silently address whichever entity next occupies the slot.
//! Callers that retain ids must track liveness themselves.

use crate::engine::bitset::Bitset;
use crate::engine::types::Entity;

/// Fixed-capacity pool of entity ids.
#[derive(Debug)]
pub struct EntityPool {
    capacity: u32,
    occupied: Bitset,
    free: Vec<Entity>,
}

impl EntityPool {
    /// Creates a pool over ids `[0, capacity)`, all available.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            occupied: Bitset::new(capacity as usize),
            free: (0..capacity).rev().collect(),
        }
    }

    /// Number of addressable slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Acquires the lowest free id, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<Entity> {
        let entity = self.free.pop()?;
        self.occupied.set(entity as usize, true);
        Some(entity)
    }

    /// Releases an id back to the pool.
    ///
    /// Returns `false` (and does nothing) when the id was not occupied.
    pub fn release(&mut self, entity: Entity) -> bool {
        if entity >= self.capacity || !self.occupied.get(entity as usize) {
            return false;
        }
        self.occupied.set(entity as usize, false);
        self.free.push(entity);
        true
    }

    /// Returns `true` if the id is currently acquired.
    #[inline]
    pub fn is_occupied(&self, entity: Entity) -> bool {
        self.occupied.get(entity as usize)
    }

    /// Count of acquired ids.
    #[inline]
    pub fn occupied_count(&self) -> u32 {
        self.occupied.popcount()
    }

    /// Count of ids still available.
    #[inline]
    pub fn available_count(&self) -> u32 {
        self.capacity - self.occupied_count()
    }

    /// Ascending enumeration of acquired ids.
    pub fn iter_occupied(&self) -> impl Iterator<Item = Entity> + '_ {
        self.occupied.indices()
    }
}
