//! Component registry: world-local instances, ownership, and change bits.
//!
//! The registry binds shared component descriptors to dense world-local
//! ids, owns the partitioned storage buffer, and maintains two bitsets per
//! component over the entity capacity:
//!
//! - `owners` — bit set ⇔ the entity owns this component,
//! - `changed` — bit set ⇔ the entity's data was written through a
//!   change-tracked path since the last full refresh.
//!
//! ## Change tracking
//! Writes routed through a [`StorageProxy`] (or [`ComponentManager::
//! set_entity_data`]) compare against the stored value and set the changed
//! bit only on a real difference. Direct typed views bypass tracking;
//! this is documented and intentional.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::bitset::Bitset;
use crate::engine::buffer::PartitionedBuffer;
use crate::engine::component::{
    Component, ComponentInstance, FieldElement, FieldValue,
};
use crate::engine::error::{
    ComponentNotFoundError, EcsError, EcsResult, EntityNotFoundError, NotRegisteredError,
    SpecError,
};
use crate::engine::types::{ComponentId, Entity};

/// World-local component registry and storage owner.
#[derive(Debug)]
pub struct ComponentManager {
    capacity: u32,
    instances: Vec<ComponentInstance>,
    by_descriptor: HashMap<u64, ComponentId>,
    by_name: HashMap<String, ComponentId>,
    owners: Vec<Bitset>,
    changed: Vec<Bitset>,
    buffer: PartitionedBuffer,
}

impl ComponentManager {
    /// Registers every descriptor, assigns dense ids in list order, and
    /// carves the storage buffer.
    ///
    /// ## Errors
    /// `SpecError::DuplicateComponent` when two descriptors share a name or
    /// the same descriptor appears twice.
    pub fn new(capacity: u32, components: &[Arc<Component>]) -> EcsResult<Self> {
        let mut by_descriptor = HashMap::with_capacity(components.len());
        let mut by_name = HashMap::with_capacity(components.len());
        let mut layouts = Vec::new();
        let mut instances = Vec::with_capacity(components.len());

        for (index, component) in components.iter().enumerate() {
            let id = index as ComponentId;
            if by_descriptor.insert(component.descriptor(), id).is_some()
                || by_name.insert(component.name().to_owned(), id).is_some()
            {
                return Err(SpecError::DuplicateComponent(component.name().to_owned()).into());
            }

            let partition = component.layout().map(|layout| {
                layouts.push(layout);
                layouts.len() - 1
            });
            instances.push(ComponentInstance::new(id, Arc::clone(component), partition));
        }

        let count = components.len();
        Ok(Self {
            capacity,
            instances,
            by_descriptor,
            by_name,
            owners: (0..count).map(|_| Bitset::new(capacity as usize)).collect(),
            changed: (0..count).map(|_| Bitset::new(capacity as usize)).collect(),
            buffer: PartitionedBuffer::new(capacity as usize, &layouts),
        })
    }

    /// Number of registered components.
    #[inline]
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    /// All instances in dense-id order.
    #[inline]
    pub fn instances(&self) -> &[ComponentInstance] {
        &self.instances
    }

    /// Resolves a descriptor to its world-local instance.
    pub fn instance(&self, component: &Component) -> EcsResult<&ComponentInstance> {
        let id = self.resolve(component)?;
        Ok(&self.instances[id as usize])
    }

    /// Resolves a component name to its world-local instance.
    #[inline]
    pub fn instance_by_name(&self, name: &str) -> Option<&ComponentInstance> {
        self.by_name.get(name).map(|&id| &self.instances[id as usize])
    }

    /// Resolves a descriptor to its dense id, or `None` if unregistered.
    #[inline]
    pub fn resolve_opt(&self, component: &Component) -> Option<ComponentId> {
        self.by_descriptor.get(&component.descriptor()).copied()
    }

    fn resolve(&self, component: &Component) -> EcsResult<ComponentId> {
        self.resolve_opt(component).ok_or_else(|| {
            EcsError::from(NotRegisteredError { name: component.name().to_owned() })
        })
    }

    fn check_entity(&self, entity: Entity) -> EcsResult<()> {
        if entity >= self.capacity {
            return Err(EntityNotFoundError { entity, capacity: self.capacity }.into());
        }
        Ok(())
    }

    /// Grants a component to an entity, optionally seeding field values.
    ///
    /// Sets the owner and changed bits, then copies any provided values
    /// into storage. Returns the entity's current component list, computed
    /// directly from owner bits.
    ///
    /// ## Errors
    /// - `NotRegistered` for an unknown descriptor.
    /// - `EntityNotFound` for an out-of-range entity.
    /// - `NoComponentsFound` when values are provided for a tag.
    /// - `ComponentNotFound` for an unknown field name in `data`.
    pub fn add_to_entity(
        &mut self,
        component: &Component,
        entity: Entity,
        data: Option<&[(&str, FieldValue)]>,
    ) -> EcsResult<Vec<ComponentId>> {
        let id = self.resolve(component)?;
        self.check_entity(entity)?;

        // Validate the payload fully before touching any bit, so a failed
        // add leaves the entity untouched.
        let mut writes = Vec::new();
        if let Some(values) = data {
            let Some(partition) = self.instances[id as usize].partition() else {
                return Err(EcsError::NoComponentsFound);
            };
            writes.reserve(values.len());
            for (field, value) in values {
                let index = self
                    .buffer
                    .partition(partition)
                    .field_index(field)
                    .ok_or_else(|| ComponentNotFoundError { name: (*field).to_owned() })?;
                writes.push((partition, index, *value));
            }
        }

        self.owners[id as usize].set(entity as usize, true);
        self.changed[id as usize].set(entity as usize, true);
        for (partition, index, value) in writes {
            self.buffer.write(partition, index, entity as usize, value);
        }

        Ok(self.entity_components(entity))
    }

    /// Revokes a component from an entity.
    ///
    /// Clears the owner and changed bits. Storage is not zeroed; the slot
    /// is reclaimed on the next write. Returns the entity's remaining
    /// component list.
    pub fn remove_from_entity(
        &mut self,
        component: &Component,
        entity: Entity,
    ) -> EcsResult<Vec<ComponentId>> {
        let id = self.resolve(component)?;
        self.check_entity(entity)?;

        self.owners[id as usize].set(entity as usize, false);
        self.changed[id as usize].set(entity as usize, false);

        Ok(self.entity_components(entity))
    }

    /// Clears owner and changed bits for the given components of one
    /// entity. Used by entity destruction.
    pub(crate) fn clear_entity(&mut self, entity: Entity, components: &[ComponentId]) {
        for &id in components {
            self.owners[id as usize].set(entity as usize, false);
            self.changed[id as usize].set(entity as usize, false);
        }
    }

    /// Owner-bit lookup.
    pub fn entity_has(&self, component: &Component, entity: Entity) -> EcsResult<bool> {
        let id = self.resolve(component)?;
        Ok(self.owners[id as usize].get(entity as usize))
    }

    /// Entities whose changed bit is set for this component.
    pub fn changed_entities(
        &self,
        component: &Component,
    ) -> EcsResult<impl Iterator<Item = Entity> + '_> {
        let id = self.resolve(component)?;
        Ok(self.changed[id as usize].indices())
    }

    /// Entities owning this component.
    pub fn owner_entities(
        &self,
        component: &Component,
    ) -> EcsResult<impl Iterator<Item = Entity> + '_> {
        let id = self.resolve(component)?;
        Ok(self.owners[id as usize].indices())
    }

    /// The entity's component list, scanned from owner bits.
    ///
    /// This is the fallback path, `O(component_count)`. The archetype
    /// manager answers the same question in `O(1)` for seated entities.
    pub fn entity_components(&self, entity: Entity) -> Vec<ComponentId> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, owners)| owners.get(entity as usize))
            .map(|(id, _)| id as ComponentId)
            .collect()
    }

    /// Reads every field of one component for one entity, in schema order.
    pub fn entity_data(
        &self,
        component: &Component,
        entity: Entity,
    ) -> EcsResult<Vec<(String, FieldValue)>> {
        let id = self.resolve(component)?;
        self.check_entity(entity)?;
        let Some(partition) = self.instances[id as usize].partition() else {
            return Err(EcsError::NoComponentsFound);
        };

        let fields = self.buffer.partition(partition).fields();
        let mut data = Vec::with_capacity(fields.len());
        for (index, span) in fields.iter().enumerate() {
            data.push((span.name.clone(), self.buffer.read(partition, index, entity as usize)));
        }
        Ok(data)
    }

    /// Writes fields of one component for one entity through the
    /// change-tracked path.
    ///
    /// Returns `true` iff at least one field actually changed.
    pub fn set_entity_data(
        &mut self,
        component: &Component,
        entity: Entity,
        values: &[(&str, FieldValue)],
    ) -> EcsResult<bool> {
        let mut proxy = self.proxy(component)?;
        proxy.set_entity(entity)?;
        let mut any = false;
        for (field, value) in values {
            any |= proxy.set(field, *value)?;
        }
        Ok(any)
    }

    /// Binds a change-tracked storage proxy to a component.
    ///
    /// ## Errors
    /// `NoComponentsFound` for tags, which own no storage.
    pub fn proxy(&mut self, component: &Component) -> EcsResult<StorageProxy<'_>> {
        let id = self.resolve(component)?;
        let Some(partition) = self.instances[id as usize].partition() else {
            return Err(EcsError::NoComponentsFound);
        };
        Ok(StorageProxy {
            buffer: &mut self.buffer,
            changed: &mut self.changed[id as usize],
            partition,
            capacity: self.capacity,
            entity: 0,
        })
    }

    /// Typed read-only view of one field array.
    ///
    /// Bypasses change tracking by design; use a proxy to record writes.
    pub fn view<T: FieldElement>(&self, component: &Component, field: &str) -> EcsResult<&[T]> {
        let id = self.resolve(component)?;
        let Some(partition) = self.instances[id as usize].partition() else {
            return Err(EcsError::NoComponentsFound);
        };
        let index = self
            .buffer
            .partition(partition)
            .field_index(field)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() })?;
        self.buffer
            .view(partition, index)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() }.into())
    }

    /// Typed mutable view of one field array. Same contract as
    /// [`ComponentManager::view`].
    pub fn view_mut<T: FieldElement>(
        &mut self,
        component: &Component,
        field: &str,
    ) -> EcsResult<&mut [T]> {
        let id = self.resolve(component)?;
        let Some(partition) = self.instances[id as usize].partition() else {
            return Err(EcsError::NoComponentsFound);
        };
        let index = self
            .buffer
            .partition(partition)
            .field_index(field)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() })?;
        self.buffer
            .view_mut(partition, index)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() }.into())
    }

    /// Clears every component's changed bitset.
    ///
    /// Called from `World::refresh` unless changes are retained.
    pub fn refresh(&mut self) {
        for changed in &mut self.changed {
            changed.clear();
        }
    }
}

/// Cursor-like accessor performing change-tracked reads and writes of one
/// component's fields at a caller-set entity id.
///
/// The proxy holds mutable borrows of the component's storage and changed
/// bitset, so it is short-lived by construction: structural world mutation
/// cannot happen while a proxy is alive.
#[derive(Debug)]
pub struct StorageProxy<'w> {
    buffer: &'w mut PartitionedBuffer,
    changed: &'w mut Bitset,
    partition: usize,
    capacity: u32,
    entity: Entity,
}

impl StorageProxy<'_> {
    /// Current entity cursor.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Moves the cursor.
    ///
    /// ## Errors
    /// `EntityNotFound` when the id is outside the world's slot space.
    pub fn set_entity(&mut self, entity: Entity) -> EcsResult<&mut Self> {
        if entity >= self.capacity {
            return Err(EntityNotFoundError { entity, capacity: self.capacity }.into());
        }
        self.entity = entity;
        Ok(self)
    }

    /// Reads one field at the cursor.
    pub fn get(&self, field: &str) -> EcsResult<FieldValue> {
        let index = self
            .buffer
            .partition(self.partition)
            .field_index(field)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() })?;
        Ok(self.buffer.read(self.partition, index, self.entity as usize))
    }

    /// Writes one field at the cursor.
    ///
    /// Stores and sets the component's changed bit only when the narrowed
    /// value differs from what is already stored. Returns whether a change
    /// was recorded.
    pub fn set(&mut self, field: &str, value: FieldValue) -> EcsResult<bool> {
        let index = self
            .buffer
            .partition(self.partition)
            .field_index(field)
            .ok_or_else(|| ComponentNotFoundError { name: field.to_owned() })?;
        let wrote = self.buffer.write(self.partition, index, self.entity as usize, value);
        if wrote {
            self.changed.set(self.entity as usize, true);
        }
        Ok(wrote)
    }
}
