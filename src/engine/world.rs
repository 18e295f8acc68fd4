//! World composition layer.
//!
//! A [`World`] owns the entity pool, component registry, archetype manager,
//! and query manager, and exposes the public operation surface. Capacity
//! and the registered component set are fixed at construction; lifecycle
//! advances strictly `Uninitialized → Initialized → Destroyed`, with any
//! step able to divert to `Error`.
//!
//! ## Refresh model
//! Structural mutations (component add/remove, query registration) run an
//! immediate *retaining* refresh so queries observe the mutation at once:
//! query↔archetype incidence is rebuilt and the cache version advances,
//! but enter/exit deltas and change bits survive. The caller-driven
//! [`World::refresh`] with `retain_changed = false` is the epoch boundary
//! that clears them.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::engine::archetype::{Archetype, ArchetypeManager};
use crate::engine::component::{Component, ComponentInstance, FieldElement, FieldValue};
use crate::engine::entity::EntityPool;
use crate::engine::error::{EcsResult, SpecError, WorldStateError};
use crate::engine::query::{Query, QueryManager};
use crate::engine::registry::{ComponentManager, StorageProxy};
use crate::engine::types::{ComponentId, Entity};

/// Lifecycle hook run during world initialization or destruction.
pub type LifecycleHook = Box<dyn FnMut() -> EcsResult<()>>;

/// World lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldState {
    /// Constructed but not yet initialized.
    Uninitialized,
    /// Live: mutations and queries are serviced.
    Initialized,
    /// Torn down; structural operations are rejected.
    Destroyed,
    /// A lifecycle step failed; state-asserting operations are rejected.
    Error,
}

/// Specification for constructing a [`World`].
#[derive(Default)]
pub struct WorldSpec {
    /// Number of entity slots; must be greater than zero.
    pub capacity: u32,

    /// Components to register, in dense-id order; must be non-empty.
    pub components: Vec<Arc<Component>>,

    /// Fail query registration on unregistered descriptors instead of
    /// silently skipping them.
    pub strict_queries: bool,

    /// Hooks run by [`World::init`], in order.
    pub on_init: Vec<LifecycleHook>,

    /// Hooks run by [`World::destroy`], in order.
    pub on_destroy: Vec<LifecycleHook>,
}

/// Fixed-capacity ECS world.
pub struct World {
    state: WorldState,
    capacity: u32,
    strict_queries: bool,
    pool: EntityPool,
    components: ComponentManager,
    archetypes: ArchetypeManager,
    queries: QueryManager,
    on_init: Vec<LifecycleHook>,
    on_destroy: Vec<LifecycleHook>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("state", &self.state)
            .field("capacity", &self.capacity)
            .field("strict_queries", &self.strict_queries)
            .field("pool", &self.pool)
            .field("components", &self.components)
            .field("archetypes", &self.archetypes)
            .field("queries", &self.queries)
            .field("on_init", &self.on_init.len())
            .field("on_destroy", &self.on_destroy.len())
            .finish()
    }
}

impl World {
    /// Validates the specification and builds an uninitialized world.
    ///
    /// ## Errors
    /// `SpecError` for zero capacity, an empty component list, or duplicate
    /// component names/descriptors.
    pub fn new(spec: WorldSpec) -> EcsResult<Self> {
        if spec.capacity == 0 {
            return Err(SpecError::ZeroCapacity.into());
        }
        if spec.components.is_empty() {
            return Err(SpecError::NoComponents.into());
        }

        let components = ComponentManager::new(spec.capacity, &spec.components)?;
        let component_count = components.count();

        Ok(Self {
            state: WorldState::Uninitialized,
            capacity: spec.capacity,
            strict_queries: spec.strict_queries,
            pool: EntityPool::new(spec.capacity),
            components,
            archetypes: ArchetypeManager::new(component_count, spec.capacity as usize),
            queries: QueryManager::new(component_count, spec.capacity as usize),
            on_init: spec.on_init,
            on_destroy: spec.on_destroy,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Entity capacity fixed at construction.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of registered components fixed at construction.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.count()
    }

    fn assert_state(&self, expected: WorldState) -> EcsResult<()> {
        if self.state != expected {
            return Err(WorldStateError { expected, actual: self.state }.into());
        }
        Ok(())
    }

    fn assert_live(&self) -> EcsResult<()> {
        if self.state == WorldState::Destroyed {
            return Err(WorldStateError {
                expected: WorldState::Initialized,
                actual: self.state,
            }
            .into());
        }
        Ok(())
    }

    /// Initializes the world: seats every entity slot in the root
    /// archetype, runs `on_init` hooks, transitions to `Initialized`, and
    /// performs one full refresh.
    ///
    /// A hook error transitions the world to `Error` and propagates.
    pub fn init(&mut self) -> EcsResult<()> {
        self.assert_state(WorldState::Uninitialized)?;

        self.archetypes.init();
        for hook in &mut self.on_init {
            if let Err(error) = hook() {
                self.state = WorldState::Error;
                warn!("init hook failed: {error}");
                return Err(error);
            }
        }

        self.state = WorldState::Initialized;
        info!(
            "world initialized (capacity {}, components {})",
            self.capacity,
            self.components.count()
        );
        self.refresh(false)
    }

    /// Destroys the world: runs `on_destroy` hooks, drops all archetypes,
    /// and transitions to `Destroyed`.
    ///
    /// A hook error transitions the world to `Error` and propagates.
    pub fn destroy(&mut self) -> EcsResult<()> {
        self.assert_state(WorldState::Initialized)?;

        for hook in &mut self.on_destroy {
            if let Err(error) = hook() {
                self.state = WorldState::Error;
                warn!("destroy hook failed: {error}");
                return Err(error);
            }
        }

        self.archetypes.destroy();
        self.queries.clear_archetypes();
        self.state = WorldState::Destroyed;
        info!("world destroyed");
        Ok(())
    }

    /// End-of-frame maintenance.
    ///
    /// Rebuilds query↔archetype incidence and bumps the cache version.
    /// Unless `retain_changed` is set, also clears every archetype's
    /// enter/exit deltas and every component's changed bits, closing the
    /// refresh window.
    pub fn refresh(&mut self, retain_changed: bool) -> EcsResult<()> {
        self.assert_state(WorldState::Initialized)?;

        self.archetypes.refresh(&mut self.queries, !retain_changed);
        if !retain_changed {
            self.components.refresh();
        }
        self.queries.invalidate(None);
        Ok(())
    }

    // ── Entities ────────────────────────────────────────────────────────────

    /// Acquires a fresh entity seated in the root archetype.
    ///
    /// Returns `None` when the pool is exhausted (not an error).
    pub fn create_entity(&mut self) -> Option<Entity> {
        if self.state == WorldState::Destroyed {
            return None;
        }
        let entity = self.pool.acquire()?;
        self.archetypes.seat(entity);
        Some(entity)
    }

    /// Destroys an entity: clears its component ownership and change bits,
    /// moves it to the root archetype, releases its id for reuse, and
    /// invalidates query caches.
    ///
    /// No refresh runs here, so the exit remains observable via
    /// [`World::query_exited`] until the next full refresh.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.assert_live()?;

        let archetype = self.archetypes.entity_archetype(entity)?;
        let owned = self.archetypes.archetype(archetype).components().to_vec();
        self.components.clear_entity(entity, &owned);
        self.archetypes.reset(entity)?;
        self.pool.release(entity);
        self.queries.invalidate(None);
        Ok(())
    }

    /// Returns `true` if the id addresses a slot in this world.
    #[inline]
    pub fn is_entity(&self, entity: Entity) -> bool {
        entity < self.capacity
    }

    /// Returns `true` if the entity is currently alive.
    #[inline]
    pub fn is_active(&self, entity: Entity) -> bool {
        self.pool.is_occupied(entity)
    }

    /// Ascending list of live entities.
    pub fn get_active_entities(&self) -> Vec<Entity> {
        self.pool.iter_occupied().collect()
    }

    /// Count of live entities.
    #[inline]
    pub fn get_active_count(&self) -> u32 {
        self.pool.occupied_count()
    }

    /// Count of entity slots still available.
    #[inline]
    pub fn get_available_count(&self) -> u32 {
        self.pool.available_count()
    }

    /// Destroys every live entity.
    pub fn purge(&mut self) -> EcsResult<()> {
        for entity in self.get_active_entities() {
            self.destroy_entity(entity)?;
        }
        Ok(())
    }

    // ── Components ──────────────────────────────────────────────────────────

    /// Grants a component to an entity, optionally seeding field values,
    /// and moves the entity to its new archetype.
    ///
    /// On an initialized world this runs an immediate retaining refresh so
    /// queries observe the move at once.
    pub fn add_component_to_entity(
        &mut self,
        component: &Component,
        entity: Entity,
        data: Option<&[(&str, FieldValue)]>,
    ) -> EcsResult<()> {
        self.assert_live()?;

        let owned = self.components.add_to_entity(component, entity, data)?;
        self.archetypes.update(entity, &owned)?;
        if self.state == WorldState::Initialized {
            self.refresh(true)?;
        }
        Ok(())
    }

    /// Revokes a component from an entity and moves the entity to its new
    /// archetype. Runs an immediate retaining refresh when initialized.
    pub fn remove_component_from_entity(
        &mut self,
        component: &Component,
        entity: Entity,
    ) -> EcsResult<()> {
        self.assert_live()?;

        let owned = self.components.remove_from_entity(component, entity)?;
        self.archetypes.update(entity, &owned)?;
        if self.state == WorldState::Initialized {
            self.refresh(true)?;
        }
        Ok(())
    }

    /// Owner-bit lookup.
    pub fn entity_has_component(&self, component: &Component, entity: Entity) -> EcsResult<bool> {
        self.components.entity_has(component, entity)
    }

    /// World-local instance bound to a descriptor.
    pub fn get_component_instance(&self, component: &Component) -> EcsResult<&ComponentInstance> {
        self.components.instance(component)
    }

    /// All component instances, in dense-id order.
    #[inline]
    pub fn get_component_instances(&self) -> &[ComponentInstance] {
        self.components.instances()
    }

    /// Entities whose data changed through a tracked write since the last
    /// full refresh.
    pub fn get_changed(&self, component: &Component) -> EcsResult<Vec<Entity>> {
        Ok(self.components.changed_entities(component)?.collect())
    }

    /// Entities owning a component.
    pub fn get_owners(&self, component: &Component) -> EcsResult<Vec<Entity>> {
        Ok(self.components.owner_entities(component)?.collect())
    }

    /// The entity's component list.
    ///
    /// Fast path: reads the entity's archetype. The registry's owner-bit
    /// scan remains available as `ComponentManager::entity_components`.
    pub fn get_entity_components(&self, entity: Entity) -> EcsResult<Vec<ComponentId>> {
        self.assert_live()?;
        let archetype = self.archetypes.entity_archetype(entity)?;
        Ok(self.archetypes.archetype(archetype).components().to_vec())
    }

    /// Reads every field of one component for one entity, in schema order.
    pub fn get_entity_data(
        &self,
        component: &Component,
        entity: Entity,
    ) -> EcsResult<Vec<(String, FieldValue)>> {
        self.components.entity_data(component, entity)
    }

    /// Writes fields through the change-tracked path; returns whether any
    /// stored value actually changed.
    pub fn set_entity_data(
        &mut self,
        component: &Component,
        entity: Entity,
        values: &[(&str, FieldValue)],
    ) -> EcsResult<bool> {
        self.components.set_entity_data(component, entity, values)
    }

    /// Binds a change-tracked storage proxy to a component.
    pub fn proxy(&mut self, component: &Component) -> EcsResult<StorageProxy<'_>> {
        self.components.proxy(component)
    }

    /// Typed read-only view of one field array; bypasses change tracking.
    pub fn view<T: FieldElement>(&self, component: &Component, field: &str) -> EcsResult<&[T]> {
        self.components.view(component, field)
    }

    /// Typed mutable view of one field array; bypasses change tracking.
    pub fn view_mut<T: FieldElement>(
        &mut self,
        component: &Component,
        field: &str,
    ) -> EcsResult<&mut [T]> {
        self.components.view_mut(component, field)
    }

    // ── Archetypes ──────────────────────────────────────────────────────────

    /// The archetype an entity currently belongs to.
    pub fn get_entity_archetype(&self, entity: Entity) -> EcsResult<&Archetype> {
        self.assert_live()?;
        let index = self.archetypes.entity_archetype(entity)?;
        Ok(self.archetypes.archetype(index))
    }

    /// Returns `true` while the entity sits in the empty-mask root.
    pub fn is_entity_in_root(&self, entity: Entity) -> EcsResult<bool> {
        self.assert_live()?;
        Ok(self.archetypes.entity_archetype(entity)? == ArchetypeManager::ROOT)
    }

    /// Number of archetypes observed so far (root included).
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.archetype_count()
    }

    /// All archetypes in creation order, root first.
    pub fn iter_archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Registers a query, compiling it on first sight.
    ///
    /// On an initialized world a newly compiled query triggers an immediate
    /// retaining refresh so its archetype set is populated before first
    /// iteration. Returns the registration index.
    pub fn register_query(&mut self, query: &Query) -> EcsResult<usize> {
        self.assert_live()?;
        let (index, newly) = self
            .queries
            .register(query, &self.components, self.strict_queries)?;
        if newly && self.state == WorldState::Initialized {
            self.refresh(true)?;
        }
        Ok(index)
    }

    /// Entities currently matching a query, deduplicated and ascending.
    pub fn query_entities(&mut self, query: &Query) -> EcsResult<Vec<Entity>> {
        let index = self.register_query(query)?;
        Ok(self.queries.entities(index, &self.archetypes))
    }

    /// The query's frozen name→id component map (union of `all` and `any`).
    pub fn query_components(&mut self, query: &Query) -> EcsResult<&HashMap<String, ComponentId>> {
        let index = self.register_query(query)?;
        Ok(self.queries.instance(index).components())
    }

    /// Entities that entered the query's archetypes since the last full
    /// refresh.
    pub fn query_entered(&mut self, query: &Query) -> EcsResult<Vec<Entity>> {
        let index = self.register_query(query)?;
        Ok(self.queries.entered(index, &self.archetypes))
    }

    /// Entities that exited the query's archetypes since the last full
    /// refresh.
    pub fn query_exited(&mut self, query: &Query) -> EcsResult<Vec<Entity>> {
        let index = self.register_query(query)?;
        Ok(self.queries.exited(index, &self.archetypes))
    }
}
