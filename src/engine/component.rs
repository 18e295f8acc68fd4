//! Component descriptors, schemas, and element types.
//!
//! A **component** is a named schema of plain numeric fields stored per
//! entity, or a **tag** (no schema, ownership bit only). Descriptors are
//! immutable after construction and may be shared across worlds; each world
//! binds a descriptor to a world-local [`ComponentInstance`] carrying the
//! dense component id and the storage partition.
//!
//! ## Field values
//! Field values cross the public API as `f64` ([`FieldValue`]) and are
//! narrowed to the field's element type on store. Equality for change
//! tracking is evaluated in the narrowed domain, so a write that saturates
//! to the already-stored value records no change.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::error::{EcsResult, SpecError};
use crate::engine::types::{is_valid_name, ComponentId};

/// Runtime representation of a single field value at the API boundary.
///
/// Wide enough to hold every element kind exactly except the extremes of
/// `u32`/`i32` beyond 2^53, which this engine never produces.
pub type FieldValue = f64;

/// Source of process-unique descriptor identities.
static NEXT_DESCRIPTOR: AtomicU64 = AtomicU64::new(1);

/// The eight numeric element kinds a schema field may take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }

    /// Required alignment of one element in bytes.
    ///
    /// Identical to [`ElementType::size`] for every supported kind.
    #[inline]
    pub const fn align(self) -> usize {
        self.size()
    }
}

/// Maps a Rust element type to its [`ElementType`] tag and [`FieldValue`]
/// conversions.
///
/// Narrowing uses `as` casts, which saturate out-of-range values.
pub trait FieldElement: bytemuck::Pod + PartialEq {
    /// The schema tag this Rust type stores as.
    const ELEMENT: ElementType;

    /// Narrows an API-level field value to this element type.
    fn from_field_value(value: FieldValue) -> Self;

    /// Widens a stored element back to an API-level field value.
    fn into_field_value(self) -> FieldValue;
}

macro_rules! impl_field_element {
    ($($ty:ty => $tag:ident),+ $(,)?) => {
        $(
            impl FieldElement for $ty {
                const ELEMENT: ElementType = ElementType::$tag;

                #[inline]
                fn from_field_value(value: FieldValue) -> Self {
                    value as $ty
                }

                #[inline]
                fn into_field_value(self) -> FieldValue {
                    self as FieldValue
                }
            }
        )+
    };
}

impl_field_element! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    f32 => F32,
    f64 => F64,
}

/// Ordered mapping from field name to element type.
///
/// Insertion order is layout order: the partition lays out one typed array
/// per field in the order the schema declares them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, ElementType)>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, consuming and returning the schema for chaining.
    pub fn with(mut self, name: &str, element: ElementType) -> Self {
        self.fields.push((name.to_owned(), element));
        self
    }

    /// Declared fields in layout order.
    #[inline]
    pub fn fields(&self) -> &[(String, ElementType)] {
        &self.fields
    }

    /// Number of declared fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-field placement within one entity's footprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    /// Field name.
    pub name: String,

    /// Element kind stored for this field.
    pub element: ElementType,

    /// Byte offset of this field within one entity's footprint.
    pub offset: usize,
}

/// Storage layout derived from a schema: per-field offsets and the total
/// per-entity footprint in bytes, alignment-padded so every field's array
/// is naturally aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionLayout {
    /// Field placements in schema order.
    pub fields: Vec<FieldLayout>,

    /// Total bytes one entity occupies across all fields.
    pub footprint: usize,
}

impl PartitionLayout {
    fn from_schema(schema: &Schema) -> Self {
        let mut fields = Vec::with_capacity(schema.len());
        let mut cursor = 0usize;
        for (name, element) in schema.fields() {
            cursor = cursor.next_multiple_of(element.align());
            fields.push(FieldLayout {
                name: name.clone(),
                element: *element,
                offset: cursor,
            });
            cursor += element.size();
        }
        Self { fields, footprint: cursor }
    }
}

/// Specification for constructing a [`Component`].
#[derive(Clone, Debug, Default)]
pub struct ComponentSpec {
    /// Human-readable name, unique within a world.
    pub name: String,

    /// Field schema; `None` declares a tag component.
    pub schema: Option<Schema>,

    /// Advisory per-component entity cap. Recorded, never enforced.
    pub max_entities: Option<u32>,
}

/// Immutable component descriptor.
///
/// Descriptors are world-independent and may be registered with any number
/// of worlds; each world assigns its own dense [`ComponentId`].
#[derive(Debug)]
pub struct Component {
    descriptor: u64,
    name: String,
    schema: Option<Schema>,
    layout: Option<PartitionLayout>,
    max_entities: Option<u32>,
}

impl Component {
    /// Validates a specification and constructs the descriptor.
    ///
    /// ## Errors
    /// `SpecError` when the component name or any field name is empty,
    /// reserved, or duplicated.
    pub fn new(spec: ComponentSpec) -> EcsResult<Self> {
        if spec.name.is_empty() {
            return Err(SpecError::EmptyName.into());
        }
        if !is_valid_name(&spec.name) {
            return Err(SpecError::ReservedName(spec.name).into());
        }

        let layout = match &spec.schema {
            None => None,
            Some(schema) => {
                for (index, (name, _)) in schema.fields().iter().enumerate() {
                    if name.is_empty() {
                        return Err(SpecError::EmptyName.into());
                    }
                    if !is_valid_name(name) {
                        return Err(SpecError::ReservedName(name.clone()).into());
                    }
                    if schema.fields()[..index].iter().any(|(prior, _)| prior == name) {
                        return Err(SpecError::DuplicateField(name.clone()).into());
                    }
                }
                Some(PartitionLayout::from_schema(schema))
            }
        };

        Ok(Self {
            descriptor: NEXT_DESCRIPTOR.fetch_add(1, Ordering::Relaxed),
            name: spec.name,
            schema: spec.schema,
            layout,
            max_entities: spec.max_entities,
        })
    }

    /// Process-unique descriptor identity.
    ///
    /// World registries and query memoization key on this value.
    #[inline]
    pub fn descriptor(&self) -> u64 {
        self.descriptor
    }

    /// Component name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this component stores no fields.
    #[inline]
    pub fn is_tag(&self) -> bool {
        self.schema.is_none()
    }

    /// Field schema, if any.
    #[inline]
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Derived storage layout, if any.
    #[inline]
    pub fn layout(&self) -> Option<&PartitionLayout> {
        self.layout.as_ref()
    }

    /// Advisory entity cap recorded at construction.
    #[inline]
    pub fn max_entities(&self) -> Option<u32> {
        self.max_entities
    }
}

/// World-local binding of a component descriptor.
///
/// Frozen after world construction: the dense id and partition assignment
/// never change for the world's lifetime.
#[derive(Debug)]
pub struct ComponentInstance {
    id: ComponentId,
    component: std::sync::Arc<Component>,
    partition: Option<usize>,
}

impl ComponentInstance {
    pub(crate) fn new(
        id: ComponentId,
        component: std::sync::Arc<Component>,
        partition: Option<usize>,
    ) -> Self {
        Self { id, component, partition }
    }

    /// Dense component id in this world.
    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The shared descriptor this instance binds.
    #[inline]
    pub fn component(&self) -> &std::sync::Arc<Component> {
        &self.component
    }

    /// Index of this component's partition in the world buffer, if any.
    #[inline]
    pub fn partition(&self) -> Option<usize> {
        self.partition
    }
}
