//! Partitioned component buffer.
//!
//! One contiguous backing allocation holds every non-tag component's data
//! for the world's lifetime. The buffer is subdivided at construction into
//! per-component **partitions**; within a partition each schema field is a
//! contiguous typed array of `capacity` elements (struct-of-arrays), fields
//! in schema order, each array start padded to its element alignment.
//!
//! ## Views
//! Field access goes through `bytemuck` casts of the relevant byte range.
//! The backing store is a `Vec<u64>`, so the base address is 8-byte aligned
//! and every computed field offset stays naturally aligned for its element
//! type; the casts can never fail.
//!
//! Reads and writes index by entity id with no per-access bounds check —
//! callers gate on entity liveness.

use crate::engine::component::{ElementType, FieldElement, FieldValue, PartitionLayout};

/// Placement of one field's typed array inside the buffer.
#[derive(Clone, Debug)]
pub struct FieldSpan {
    /// Field name.
    pub name: String,

    /// Element kind stored in this array.
    pub element: ElementType,

    /// Absolute byte offset of the array within the buffer.
    start: usize,
}

/// The byte region owned by one non-tag component: one [`FieldSpan`] per
/// schema field, in schema order.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    fields: Vec<FieldSpan>,
}

impl Partition {
    /// Field spans in schema order.
    #[inline]
    pub fn fields(&self) -> &[FieldSpan] {
        &self.fields
    }

    /// Resolves a field name to its index in this partition.
    #[inline]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|span| span.name == name)
    }
}

/// Contiguous backing buffer subdivided into per-component partitions.
#[derive(Debug)]
pub struct PartitionedBuffer {
    words: Vec<u64>,
    capacity: usize,
    partitions: Vec<Partition>,
}

impl PartitionedBuffer {
    /// Lays out one partition per layout, in order, and allocates the
    /// backing store in a single zeroed allocation.
    ///
    /// Layouts are fixed thereafter; the buffer never grows.
    pub fn new(capacity: usize, layouts: &[&PartitionLayout]) -> Self {
        let mut partitions = Vec::with_capacity(layouts.len());
        let mut cursor = 0usize;

        for layout in layouts {
            let mut fields = Vec::with_capacity(layout.fields.len());
            for field in &layout.fields {
                cursor = cursor.next_multiple_of(field.element.align());
                fields.push(FieldSpan {
                    name: field.name.clone(),
                    element: field.element,
                    start: cursor,
                });
                cursor += capacity * field.element.size();
            }
            partitions.push(Partition { fields });
        }

        Self {
            words: vec![0; cursor.div_ceil(std::mem::size_of::<u64>())],
            capacity,
            partitions,
        }
    }

    /// Number of entity slots per field array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The partition table, in creation order.
    #[inline]
    pub fn partition(&self, index: usize) -> &Partition {
        &self.partitions[index]
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Typed read-only view of one field array.
    ///
    /// Returns `None` when the field index is out of range or `T` does not
    /// match the field's element kind. Direct view access bypasses change
    /// tracking; this is intentional (use a storage proxy to record
    /// changes).
    pub fn view<T: FieldElement>(&self, partition: usize, field: usize) -> Option<&[T]> {
        let span = self.partitions.get(partition)?.fields.get(field)?;
        if span.element != T::ELEMENT {
            return None;
        }
        let end = span.start + self.capacity * span.element.size();
        Some(bytemuck::cast_slice(&self.bytes()[span.start..end]))
    }

    /// Typed mutable view of one field array. Same contract as
    /// [`PartitionedBuffer::view`].
    pub fn view_mut<T: FieldElement>(&mut self, partition: usize, field: usize) -> Option<&mut [T]> {
        let span = self.partitions.get(partition)?.fields.get(field)?;
        if span.element != T::ELEMENT {
            return None;
        }
        let start = span.start;
        let end = start + self.capacity * span.element.size();
        Some(bytemuck::cast_slice_mut(&mut self.bytes_mut()[start..end]))
    }

    /// Reads one field of one entity, widened to a [`FieldValue`].
    pub fn read(&self, partition: usize, field: usize, entity: usize) -> FieldValue {
        let span = &self.partitions[partition].fields[field];
        let (start, element) = (span.start, span.element);
        match element {
            ElementType::I8 => self.read_typed::<i8>(start, entity),
            ElementType::U8 => self.read_typed::<u8>(start, entity),
            ElementType::I16 => self.read_typed::<i16>(start, entity),
            ElementType::U16 => self.read_typed::<u16>(start, entity),
            ElementType::I32 => self.read_typed::<i32>(start, entity),
            ElementType::U32 => self.read_typed::<u32>(start, entity),
            ElementType::F32 => self.read_typed::<f32>(start, entity),
            ElementType::F64 => self.read_typed::<f64>(start, entity),
        }
    }

    /// Writes one field of one entity, narrowing to the element kind.
    ///
    /// Returns `true` iff the stored value actually changed.
    pub fn write(&mut self, partition: usize, field: usize, entity: usize, value: FieldValue) -> bool {
        let span = &self.partitions[partition].fields[field];
        let (start, element) = (span.start, span.element);
        match element {
            ElementType::I8 => self.write_typed::<i8>(start, entity, value),
            ElementType::U8 => self.write_typed::<u8>(start, entity, value),
            ElementType::I16 => self.write_typed::<i16>(start, entity, value),
            ElementType::U16 => self.write_typed::<u16>(start, entity, value),
            ElementType::I32 => self.write_typed::<i32>(start, entity, value),
            ElementType::U32 => self.write_typed::<u32>(start, entity, value),
            ElementType::F32 => self.write_typed::<f32>(start, entity, value),
            ElementType::F64 => self.write_typed::<f64>(start, entity, value),
        }
    }

    fn read_typed<T: FieldElement>(&self, start: usize, entity: usize) -> FieldValue {
        let end = start + self.capacity * std::mem::size_of::<T>();
        let slice: &[T] = bytemuck::cast_slice(&self.bytes()[start..end]);
        slice[entity].into_field_value()
    }

    fn write_typed<T: FieldElement>(&mut self, start: usize, entity: usize, value: FieldValue) -> bool {
        let end = start + self.capacity * std::mem::size_of::<T>();
        let converted = T::from_field_value(value);
        let slice: &mut [T] = bytemuck::cast_slice_mut(&mut self.bytes_mut()[start..end]);
        if slice[entity] != converted {
            slice[entity] = converted;
            true
        } else {
            false
        }
    }
}
