//! Core ECS Types, Identifiers, and Limits
//!
//! This module defines the **fundamental types, identifiers, and layout
//! constants** shared across all engine subsystems: entity management,
//! component storage, archetypes, and queries.
//!
//! ## Design Philosophy
//!
//! The ECS is designed around:
//!
//! - **Fixed capacity** — a world addresses entities in `[0, capacity)`,
//!   so entity ids double as array indices everywhere,
//! - **Dense component ids** — components receive compact ids in
//!   `[0, component_count)` so component sets pack into small bitsets,
//! - **Word-packed bitsets** — membership, ownership, and change tracking
//!   all operate on 32-bit words for cheap mask arithmetic.
//!
//! ## Entity Representation
//!
//! An entity is a bare `u32` index. It is *not* a handle: there is no
//! generation counter, and a released id may be reacquired by a later
//! `create`. Callers that retain entity ids across destroys must track
//! liveness themselves.

/// Entity identifier: an index into the world's fixed-capacity slot space.
pub type Entity = u32;

/// Dense identifier for a component registered in a world.
pub type ComponentId = u16;

/// Monotonic version counter used by the query result cache.
pub type Version = u64;

/// Word type backing all bitsets.
pub type Word = u32;

/// Number of bits per bitset word.
pub const WORD_BITS: usize = 32;

const _: [(); 1] = [(); (WORD_BITS == Word::BITS as usize) as usize];

/// Component and field names rejected at descriptor construction.
///
/// `"id"` is reserved for entity identity; the remaining tokens are the
/// engine's own field names for partition handles and lifecycle hooks.
pub const RESERVED_NAMES: &[&str] = &["id", "partition", "on_init", "on_destroy"];

/// Returns `true` if `name` may be used as a component or field name.
#[inline]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !RESERVED_NAMES.contains(&name)
}
