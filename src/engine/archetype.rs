//! Archetype grouping and transactional entity movement.
//!
//! An **archetype** is the equivalence class of entities sharing the exact
//! same component set, identified by a component-mask bitset. The manager
//! owns every observed archetype, maps each entity slot to its current
//! archetype, and rebuilds query↔archetype incidence at every refresh.
//!
//! ## Deltas
//! Each archetype tracks membership deltas since the last full refresh in
//! its `entered`/`exited` bitsets. Adding an entity sets `entered` and
//! clears `exited`; removing does the inverse. The pairing keeps the two
//! sets disjoint at all times, so a net add→remove→add inside one refresh
//! window reads as a single enter.
//!
//! ## De-duplication
//! The registry keys archetypes by their mask words directly, so lookup on
//! the mutation path is a hash of a small word slice with no allocation.

use std::collections::HashMap;

use log::debug;

use crate::engine::bitset::Bitset;
use crate::engine::error::{EcsResult, EntityNotFoundError};
use crate::engine::query::{is_match, QueryManager};
use crate::engine::types::{ComponentId, Entity, Word};

/// A set of entities sharing one exact component mask.
#[derive(Debug)]
pub struct Archetype {
    id: usize,
    mask: Bitset,
    components: Vec<ComponentId>,
    entities: Bitset,
    entered: Bitset,
    exited: Bitset,
    candidates: HashMap<usize, bool>,
}

impl Archetype {
    fn new(id: usize, mask: Bitset, components: Vec<ComponentId>, capacity: usize) -> Self {
        Self {
            id,
            mask,
            components,
            entities: Bitset::new(capacity),
            entered: Bitset::new(capacity),
            exited: Bitset::new(capacity),
            candidates: HashMap::new(),
        }
    }

    /// Dense archetype id (index in the manager's registry).
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Component mask identifying this archetype.
    #[inline]
    pub fn mask(&self) -> &Bitset {
        &self.mask
    }

    /// Components present, in the order the archetype was created with.
    #[inline]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Current members.
    #[inline]
    pub fn entities(&self) -> &Bitset {
        &self.entities
    }

    /// Entities that entered since the last full refresh.
    #[inline]
    pub fn entered(&self) -> &Bitset {
        &self.entered
    }

    /// Entities that exited since the last full refresh.
    #[inline]
    pub fn exited(&self) -> &Bitset {
        &self.exited
    }

    /// Returns `true` when no entity is currently a member.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.popcount() == 0
    }

    fn add_entity(&mut self, entity: Entity) {
        self.entities.set(entity as usize, true);
        self.entered.set(entity as usize, true);
        self.exited.set(entity as usize, false);
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.entities.set(entity as usize, false);
        self.exited.set(entity as usize, true);
        self.entered.set(entity as usize, false);
    }

    fn refresh(&mut self) {
        self.entered.clear();
        self.exited.clear();
    }
}

/// Owner of all archetypes and the entity→archetype map.
#[derive(Debug)]
pub struct ArchetypeManager {
    component_count: usize,
    capacity: usize,
    archetypes: Vec<Archetype>,
    by_mask: HashMap<Box<[Word]>, usize>,
    entity_archetypes: Vec<usize>,
    query_archetypes: HashMap<usize, Vec<usize>>,
    scratch: Bitset,
}

impl ArchetypeManager {
    /// Index of the root archetype (empty mask).
    pub const ROOT: usize = 0;

    /// Creates the manager with only the root archetype populated.
    pub fn new(component_count: usize, capacity: usize) -> Self {
        let root = Archetype::new(Self::ROOT, Bitset::new(component_count), Vec::new(), capacity);
        let mut by_mask = HashMap::new();
        by_mask.insert(root.mask.words().into(), Self::ROOT);

        Self {
            component_count,
            capacity,
            archetypes: vec![root],
            by_mask,
            entity_archetypes: vec![Self::ROOT; capacity],
            query_archetypes: HashMap::new(),
            scratch: Bitset::new(component_count),
        }
    }

    /// Completes two-phase construction by seating every entity slot in
    /// the root archetype.
    ///
    /// Run by world initialization. Slots seated at construction (the
    /// normal path, where capacity is known up front) are left untouched,
    /// so structural mutations made before `init` survive it.
    pub fn init(&mut self) {
        if self.entity_archetypes.is_empty() {
            self.entity_archetypes = vec![Self::ROOT; self.capacity];
        }
    }

    /// Number of archetypes observed so far (root included).
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Archetype by dense id.
    #[inline]
    pub fn archetype(&self, index: usize) -> &Archetype {
        &self.archetypes[index]
    }

    /// All archetypes in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// The archetype id an entity currently belongs to.
    pub fn entity_archetype(&self, entity: Entity) -> EcsResult<usize> {
        self.check_entity(entity)?;
        Ok(self.entity_archetypes[entity as usize])
    }

    /// Archetype ids recorded for a query at the last refresh.
    pub fn archetypes_for_query(&self, query_index: usize) -> &[usize] {
        self.query_archetypes
            .get(&query_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn check_entity(&self, entity: Entity) -> EcsResult<()> {
        if entity as usize >= self.capacity {
            return Err(EntityNotFoundError { entity, capacity: self.capacity as u32 }.into());
        }
        Ok(())
    }

    /// Places a freshly created entity in the root archetype.
    pub fn seat(&mut self, entity: Entity) {
        self.entity_archetypes[entity as usize] = Self::ROOT;
        self.archetypes[Self::ROOT].add_entity(entity);
    }

    /// Recomputes the archetype for an entity's current component list and
    /// moves the entity if the mask changed.
    ///
    /// Returns the (possibly unchanged) archetype id.
    pub fn update(&mut self, entity: Entity, components: &[ComponentId]) -> EcsResult<usize> {
        self.check_entity(entity)?;

        self.scratch.clear();
        for &component in components {
            self.scratch.set(component as usize, true);
        }

        let current = self.entity_archetypes[entity as usize];
        if self.archetypes[current].mask.words() == self.scratch.words() {
            return Ok(current);
        }

        let target = match self.by_mask.get(self.scratch.words()) {
            Some(&index) => index,
            None => {
                let index = self.archetypes.len();
                debug!(
                    "archetype {index} created for mask {:?}",
                    self.scratch.words()
                );
                self.archetypes.push(Archetype::new(
                    index,
                    self.scratch.clone(),
                    components.to_vec(),
                    self.capacity,
                ));
                self.by_mask.insert(self.scratch.words().into(), index);
                index
            }
        };

        self.archetypes[current].remove_entity(entity);
        self.archetypes[target].add_entity(entity);
        self.entity_archetypes[entity as usize] = target;
        Ok(target)
    }

    /// Forcibly moves an entity back to the root archetype.
    pub fn reset(&mut self, entity: Entity) -> EcsResult<usize> {
        self.check_entity(entity)?;

        let current = self.entity_archetypes[entity as usize];
        if current != Self::ROOT {
            self.archetypes[current].remove_entity(entity);
            self.archetypes[Self::ROOT].add_entity(entity);
            self.entity_archetypes[entity as usize] = Self::ROOT;
        }
        Ok(Self::ROOT)
    }

    /// Memoized candidacy test for one archetype against one query.
    pub fn is_candidate(&mut self, archetype: usize, queries: &QueryManager, query_index: usize) -> bool {
        let instance = queries.instance(query_index);
        if let Some(&cached) = self.archetypes[archetype].candidates.get(&instance.index()) {
            return cached;
        }
        let matched = is_match(
            self.archetypes[archetype].mask(),
            instance.and(),
            instance.or(),
            instance.not(),
        );
        self.archetypes[archetype].candidates.insert(instance.index(), matched);
        matched
    }

    /// Rebuilds query↔archetype incidence from scratch and, on a full
    /// refresh, clears every archetype's enter/exit deltas.
    ///
    /// Incidence records only matching, currently non-empty archetypes.
    /// Delta clearing is unconditional across archetypes: matched or not,
    /// every archetype's `entered`/`exited` is cleared when `clear_deltas`
    /// is set.
    pub fn refresh(&mut self, queries: &mut QueryManager, clear_deltas: bool) {
        self.query_archetypes.clear();
        queries.clear_archetypes();

        // Materialize the query list length once; registration cannot occur
        // mid-refresh.
        let query_count = queries.len();

        for archetype_index in 0..self.archetypes.len() {
            for query_index in 0..query_count {
                if self.is_candidate(archetype_index, queries, query_index)
                    && !self.archetypes[archetype_index].is_empty()
                {
                    self.query_archetypes
                        .entry(query_index)
                        .or_default()
                        .push(archetype_index);
                    queries.record_archetype(query_index, archetype_index);
                }
            }
            if clear_deltas {
                self.archetypes[archetype_index].refresh();
            }
        }
    }

    /// Drops all archetypes and incidence state.
    pub fn destroy(&mut self) {
        self.archetypes.clear();
        self.by_mask.clear();
        self.entity_archetypes.clear();
        self.query_archetypes.clear();
        self.scratch = Bitset::new(self.component_count);
    }
}
