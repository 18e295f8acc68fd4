//! Error types for world construction, mutation, and query execution.
//!
//! This module declares focused, composable error types used across the
//! engine. Each error carries enough context to make failures actionable
//! while remaining small and cheap to pass around or convert into the
//! aggregate [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g.
//!   invalid spec, out-of-range entity, wrong lifecycle state).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcsError`]
//!   so call sites can use `?`.
//! * **Actionability:** Structured fields (offending name, entity id and
//!   capacity, expected vs. actual state) make logs useful without
//!   reproducing the issue.
//!
//! ## Taxonomy
//! Programmer errors (spec violations, out-of-range entities, unregistered
//! components, invalid state transitions) surface as the appropriate kind.
//! Capacity exhaustion of the entity pool is **not** an error: `create`
//! returns `None`.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::Entity;
use crate::engine::world::WorldState;

/// Crate-wide result alias.
pub type EcsResult<T> = Result<T, EcsError>;

/// Returned when a component, query, or world specification is invalid.
///
/// Spec validation happens at construction time, before any storage is
/// allocated, so a `SpecError` never leaves a world partially built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A component or field name was empty.
    EmptyName,

    /// A component or field name collided with the reserved table.
    ReservedName(String),

    /// A schema declared the same field name twice.
    DuplicateField(String),

    /// Two components in one world share a name.
    DuplicateComponent(String),

    /// A world was specified with `capacity == 0`.
    ZeroCapacity,

    /// A world was specified with an empty component list.
    NoComponents,

    /// A query listed the same component in more than one of its sets.
    OverlappingQuerySets(String),

    /// A query specified no components in any of its sets.
    EmptyQuery,
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::EmptyName => f.write_str("name must not be empty"),
            SpecError::ReservedName(name) => write!(f, "name {name:?} is reserved"),
            SpecError::DuplicateField(name) => write!(f, "duplicate schema field {name:?}"),
            SpecError::DuplicateComponent(name) => {
                write!(f, "duplicate component name {name:?} in world")
            }
            SpecError::ZeroCapacity => f.write_str("world capacity must be greater than zero"),
            SpecError::NoComponents => f.write_str("world requires at least one component"),
            SpecError::OverlappingQuerySets(name) => {
                write!(f, "component {name:?} appears in more than one query set")
            }
            SpecError::EmptyQuery => f.write_str("query must name at least one component"),
        }
    }
}

impl std::error::Error for SpecError {}

/// Returned when an entity id is outside the world's slot space.
///
/// ### Fields
/// * `entity` — The offending entity id.
/// * `capacity` — The world capacity that bounds valid ids (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityNotFoundError {
    /// Offending entity id.
    pub entity: Entity,

    /// World capacity bounding valid ids (exclusive).
    pub capacity: u32,
}

impl fmt::Display for EntityNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity {} out of range (capacity {})",
            self.entity, self.capacity
        )
    }
}

impl std::error::Error for EntityNotFoundError {}

/// Returned when an operation is attempted in the wrong lifecycle state.
///
/// World state advances strictly `Uninitialized → Initialized → Destroyed`,
/// with any step able to divert to `Error`. Operations assert the state
/// they require and fail with this error otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldStateError {
    /// State the operation requires.
    pub expected: WorldState,

    /// State the world was actually in.
    pub actual: WorldState,
}

impl fmt::Display for WorldStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "world is {:?} (operation requires {:?})",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for WorldStateError {}

/// Returned when a component or schema field lookup by name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNotFoundError {
    /// Name that failed to resolve.
    pub name: String,
}

impl fmt::Display for ComponentNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no component or field named {:?}", self.name)
    }
}

impl std::error::Error for ComponentNotFoundError {}

/// Returned when a component descriptor has no instance in the target world.
///
/// Component mutation always requires registration. Query compilation skips
/// unknown descriptors silently unless the world enables strict queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotRegisteredError {
    /// Name of the unregistered component descriptor.
    pub name: String,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component {:?} is not registered in this world", self.name)
    }
}

impl std::error::Error for NotRegisteredError {}

/// Aggregate error for all engine operations.
///
/// Every failure mode in the crate converts into this type, so public
/// signatures stay uniform ([`EcsResult`]) while call sites can still match
/// on the specific kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Invalid component, query, or world specification.
    Spec(SpecError),

    /// Entity id outside the world's slot space.
    EntityNotFound(EntityNotFoundError),

    /// Operation attempted in the wrong lifecycle state.
    WorldState(WorldStateError),

    /// Component or field name lookup failed.
    ComponentNotFound(ComponentNotFoundError),

    /// Storage was requested for a tag component, which has no fields.
    NoComponentsFound,

    /// Component descriptor has no instance in the target world.
    NotRegistered(NotRegisteredError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::Spec(e) => write!(f, "{e}"),
            EcsError::EntityNotFound(e) => write!(f, "{e}"),
            EcsError::WorldState(e) => write!(f, "{e}"),
            EcsError::ComponentNotFound(e) => write!(f, "{e}"),
            EcsError::NoComponentsFound => f.write_str("component has no stored fields"),
            EcsError::NotRegistered(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<SpecError> for EcsError {
    fn from(e: SpecError) -> Self { EcsError::Spec(e) }
}
impl From<EntityNotFoundError> for EcsError {
    fn from(e: EntityNotFoundError) -> Self { EcsError::EntityNotFound(e) }
}
impl From<WorldStateError> for EcsError {
    fn from(e: WorldStateError) -> Self { EcsError::WorldState(e) }
}
impl From<ComponentNotFoundError> for EcsError {
    fn from(e: ComponentNotFoundError) -> Self { EcsError::ComponentNotFound(e) }
}
impl From<NotRegisteredError> for EcsError {
    fn from(e: NotRegisteredError) -> Self { EcsError::NotRegistered(e) }
}
