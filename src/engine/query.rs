//! Query predicates, compilation, and result caching.
//!
//! A [`Query`] is an immutable three-way predicate over components:
//! **all** (every listed component present), **any** (at least one present,
//! when the set is non-empty), **none** (no listed component present).
//! Worlds compile a query into a [`QueryInstance`]: three bitmasks over the
//! component-id space plus the set of matching archetypes.
//!
//! ## Caching
//! Entity results are bitsets rebuilt from the union of matching
//! archetypes' membership, validated against a monotonic global version and
//! recycled through a free-list pool. Any structural mutation bumps the
//! version, so stale results are never observed.
//!
//! ## Unknown components
//! Compilation silently skips descriptors with no instance in the world.
//! Worlds constructed with strict queries fail registration with
//! `NotRegistered` instead.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::engine::archetype::ArchetypeManager;
use crate::engine::bitset::Bitset;
use crate::engine::component::Component;
use crate::engine::error::{EcsResult, NotRegisteredError, SpecError};
use crate::engine::registry::ComponentManager;
use crate::engine::types::{ComponentId, Entity, Version};

/// Word-wise candidacy predicate.
///
/// A target mask matches when it contains every `and` bit, intersects no
/// `not` bit, and — if `or` is non-empty — intersects at least one `or`
/// bit. An empty target mask never matches.
pub fn is_match(target: &Bitset, and: &Bitset, or: &Bitset, not: &Bitset) -> bool {
    if target.popcount() == 0 {
        return false;
    }
    for ((&t, &a), &n) in target.words().iter().zip(and.words()).zip(not.words()) {
        if t & a != a {
            return false;
        }
        if t & n != 0 {
            return false;
        }
    }
    if or.popcount() > 0 && target.words().iter().zip(or.words()).all(|(&t, &o)| t & o == 0) {
        return false;
    }
    true
}

/// Specification for constructing a [`Query`].
#[derive(Clone, Default)]
pub struct QuerySpec {
    /// Components that must all be present.
    pub all: Vec<Arc<Component>>,

    /// Components of which at least one must be present (empty = no-op).
    pub any: Vec<Arc<Component>>,

    /// Components that must all be absent.
    pub none: Vec<Arc<Component>>,
}

/// Source of process-unique query identities.
static NEXT_QUERY: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

/// Immutable three-way component predicate.
///
/// Duplicates within a set are removed at construction; a component
/// appearing in more than one set is a construction error.
pub struct Query {
    descriptor: u64,
    all: Vec<Arc<Component>>,
    any: Vec<Arc<Component>>,
    none: Vec<Arc<Component>>,
}

impl Query {
    /// Validates a specification and constructs the predicate.
    ///
    /// ## Errors
    /// - `SpecError::EmptyQuery` when every set is empty.
    /// - `SpecError::OverlappingQuerySets` when a component appears in more
    ///   than one set.
    pub fn new(spec: QuerySpec) -> EcsResult<Self> {
        let all = dedup(spec.all);
        let any = dedup(spec.any);
        let none = dedup(spec.none);

        if all.is_empty() && any.is_empty() && none.is_empty() {
            return Err(SpecError::EmptyQuery.into());
        }
        for component in all.iter().chain(any.iter()) {
            if none.iter().any(|other| other.descriptor() == component.descriptor()) {
                return Err(SpecError::OverlappingQuerySets(component.name().to_owned()).into());
            }
        }
        for component in &all {
            if any.iter().any(|other| other.descriptor() == component.descriptor()) {
                return Err(SpecError::OverlappingQuerySets(component.name().to_owned()).into());
            }
        }

        Ok(Self {
            descriptor: NEXT_QUERY.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            all,
            any,
            none,
        })
    }

    /// Process-unique query identity; registration memoizes on this.
    #[inline]
    pub fn descriptor(&self) -> u64 {
        self.descriptor
    }

    /// The `all` set.
    #[inline]
    pub fn all(&self) -> &[Arc<Component>] {
        &self.all
    }

    /// The `any` set.
    #[inline]
    pub fn any(&self) -> &[Arc<Component>] {
        &self.any
    }

    /// The `none` set.
    #[inline]
    pub fn none(&self) -> &[Arc<Component>] {
        &self.none
    }
}

fn dedup(set: Vec<Arc<Component>>) -> Vec<Arc<Component>> {
    let mut out: Vec<Arc<Component>> = Vec::with_capacity(set.len());
    for component in set {
        if !out.iter().any(|seen| seen.descriptor() == component.descriptor()) {
            out.push(component);
        }
    }
    out
}

/// World-local compiled form of a query.
#[derive(Debug)]
pub struct QueryInstance {
    index: usize,
    id: String,
    and: Bitset,
    or: Bitset,
    not: Bitset,
    components: HashMap<String, ComponentId>,
    archetypes: Vec<usize>,
}

impl QueryInstance {
    /// Registration index; stable for the world's lifetime.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Canonical mask-triple id used for instance de-duplication.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Required-components mask.
    #[inline]
    pub fn and(&self) -> &Bitset {
        &self.and
    }

    /// Any-of mask.
    #[inline]
    pub fn or(&self) -> &Bitset {
        &self.or
    }

    /// Excluded-components mask.
    #[inline]
    pub fn not(&self) -> &Bitset {
        &self.not
    }

    /// Frozen name→id map over the union of `all` and `any`.
    #[inline]
    pub fn components(&self) -> &HashMap<String, ComponentId> {
        &self.components
    }

    /// Matching archetypes recorded at the last refresh.
    #[inline]
    pub fn archetypes(&self) -> &[usize] {
        &self.archetypes
    }

    /// Number of archetypes recorded at the last refresh.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }
}

/// Registry of compiled queries plus the versioned result cache.
#[derive(Debug)]
pub struct QueryManager {
    capacity: usize,
    component_count: usize,
    instances: Vec<QueryInstance>,
    by_descriptor: HashMap<u64, usize>,
    by_id: HashMap<String, usize>,
    version: Version,
    entity_cache: HashMap<usize, (Bitset, Version)>,
    pool: Vec<Bitset>,
}

impl QueryManager {
    /// Creates an empty manager for a world of the given dimensions.
    pub fn new(component_count: usize, capacity: usize) -> Self {
        Self {
            capacity,
            component_count,
            instances: Vec::new(),
            by_descriptor: HashMap::new(),
            by_id: HashMap::new(),
            version: 0,
            entity_cache: HashMap::new(),
            pool: Vec::new(),
        }
    }

    /// Number of registered query instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` when no query is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instance by registration index.
    #[inline]
    pub fn instance(&self, index: usize) -> &QueryInstance {
        &self.instances[index]
    }

    /// Current global cache version.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Registers a query, compiling it on first sight.
    ///
    /// Memoized by descriptor identity; two descriptors compiling to the
    /// same mask triple share one instance. Returns the registration index
    /// and whether a new instance was created (callers refresh incidence
    /// for new instances on initialized worlds).
    pub fn register(
        &mut self,
        query: &Query,
        registry: &ComponentManager,
        strict: bool,
    ) -> EcsResult<(usize, bool)> {
        if let Some(&index) = self.by_descriptor.get(&query.descriptor()) {
            return Ok((index, false));
        }

        let all = resolve_set(query.all(), registry, strict)?;
        let any = resolve_set(query.any(), registry, strict)?;
        let none = resolve_set(query.none(), registry, strict)?;

        let and = mask_of(&all, self.component_count);
        let or = mask_of(&any, self.component_count);
        let not = mask_of(&none, self.component_count);
        let id = format!(
            "{}:{}:{}",
            stringify_words(&and),
            stringify_words(&or),
            stringify_words(&not)
        );

        if let Some(&index) = self.by_id.get(&id) {
            self.by_descriptor.insert(query.descriptor(), index);
            return Ok((index, false));
        }

        let mut components = HashMap::with_capacity(all.len() + any.len());
        for (name, component_id) in all.into_iter().chain(any) {
            components.insert(name, component_id);
        }

        let index = self.instances.len();
        debug!("query {index} registered as {id}");
        self.by_descriptor.insert(query.descriptor(), index);
        self.by_id.insert(id.clone(), index);
        self.instances.push(QueryInstance {
            index,
            id,
            and,
            or,
            not,
            components,
            archetypes: Vec::new(),
        });
        Ok((index, true))
    }

    /// Clears every instance's archetype set ahead of an incidence rebuild.
    pub(crate) fn clear_archetypes(&mut self) {
        for instance in &mut self.instances {
            instance.archetypes.clear();
        }
    }

    /// Records a matching archetype for an instance during refresh.
    pub(crate) fn record_archetype(&mut self, query_index: usize, archetype_index: usize) {
        self.instances[query_index].archetypes.push(archetype_index);
    }

    /// Invalidates cached results.
    ///
    /// With a specific query, only that query's cached entities are
    /// dropped; without, the global version advances and every cached
    /// result goes stale at once.
    pub fn invalidate(&mut self, query: Option<usize>) {
        match query {
            Some(index) => {
                if let Some((bitset, _)) = self.entity_cache.remove(&index) {
                    self.pool.push(bitset);
                }
            }
            None => self.version += 1,
        }
    }

    /// Entities currently matched by a registered query, deduplicated and
    /// ascending.
    ///
    /// Served from the cache when the cached version is current; otherwise
    /// rebuilt into a pooled bitset from the union of matching archetypes'
    /// membership.
    pub fn entities(&mut self, query_index: usize, archetypes: &ArchetypeManager) -> Vec<Entity> {
        if let Some((bitset, version)) = self.entity_cache.get(&query_index) {
            if *version == self.version {
                return bitset.indices().collect();
            }
        }

        let mut result = self.acquire();
        for &archetype_index in self.instances[query_index].archetypes() {
            result.union_with(archetypes.archetype(archetype_index).entities());
        }

        let entities = result.indices().collect();
        if let Some((stale, _)) = self.entity_cache.insert(query_index, (result, self.version)) {
            self.pool.push(stale);
        }
        entities
    }

    /// Entities that entered the query's archetypes since the last full
    /// refresh.
    pub fn entered(&mut self, query_index: usize, archetypes: &ArchetypeManager) -> Vec<Entity> {
        self.delta(query_index, archetypes, true)
    }

    /// Entities that exited the query's archetypes since the last full
    /// refresh.
    pub fn exited(&mut self, query_index: usize, archetypes: &ArchetypeManager) -> Vec<Entity> {
        self.delta(query_index, archetypes, false)
    }

    fn delta(&mut self, query_index: usize, archetypes: &ArchetypeManager, entered: bool) -> Vec<Entity> {
        // Single-pass enumeration with a scratch bitset for deduplication.
        let mut visited = self.acquire();
        for &archetype_index in archetypes.archetypes_for_query(query_index) {
            let archetype = archetypes.archetype(archetype_index);
            visited.union_with(if entered { archetype.entered() } else { archetype.exited() });
        }
        let out = visited.indices().collect();
        self.pool.push(visited);
        out
    }

    fn acquire(&mut self) -> Bitset {
        let mut bitset = self
            .pool
            .pop()
            .unwrap_or_else(|| Bitset::new(self.capacity));
        bitset.clear();
        bitset
    }
}

fn resolve_set(
    set: &[Arc<Component>],
    registry: &ComponentManager,
    strict: bool,
) -> EcsResult<Vec<(String, ComponentId)>> {
    let mut out = Vec::with_capacity(set.len());
    for component in set {
        match registry.resolve_opt(component) {
            Some(id) => out.push((component.name().to_owned(), id)),
            None if strict => {
                return Err(NotRegisteredError { name: component.name().to_owned() }.into());
            }
            None => debug!("query skips unregistered component {:?}", component.name()),
        }
    }
    Ok(out)
}

fn mask_of(set: &[(String, ComponentId)], component_count: usize) -> Bitset {
    let mut mask = Bitset::new(component_count);
    for (_, id) in set {
        mask.set(*id as usize, true);
    }
    mask
}

fn stringify_words(mask: &Bitset) -> String {
    mask.words()
        .iter()
        .map(|word| word.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
