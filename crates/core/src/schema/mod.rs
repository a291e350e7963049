//! Schema module for Dido records.
//!
//! A [`Schema`] is an ordered set of [`Field`]s keyed by stable 1-based
//! indices that need not be contiguous. Field metadata lives in a shared
//! field table; a schema pairs that table with a [`Traversal`] saying which
//! indices are present. Projecting a schema to a [`PartialSchema`] narrows
//! the traversal and keeps the table, so a projected field always reports
//! the same index, name and type as in the schema it came from.

mod builder;
mod field;
mod partial;
mod traversal;

pub use builder::SchemaBuilder;
pub use field::Field;
pub use partial::PartialSchema;
pub use traversal::{IndexSequence, Indices, Transposed};

pub(crate) use traversal::Traversal;

use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;

/// Field metadata shared between a schema and every projection of it.
#[derive(Debug)]
pub(crate) struct FieldTable {
    /// `slots[i - 1]` holds the field at index `i`.
    slots: Vec<Option<Field>>,
    names: HashMap<String, usize>,
}

impl FieldTable {
    /// Number of raw index slots, equal to the largest defined index.
    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&Field> {
        index
            .checked_sub(1)
            .and_then(|slot| self.slots.get(slot))
            .and_then(Option::as_ref)
    }
}

/// Describes the fields of a record.
#[derive(Clone)]
pub struct Schema {
    fields: Rc<FieldTable>,
    traversal: Rc<Traversal>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// A schema with no fields.
    pub fn empty() -> Self {
        Self {
            fields: Rc::new(FieldTable {
                slots: Vec::new(),
                names: HashMap::new(),
            }),
            traversal: Rc::new(Traversal::empty()),
        }
    }

    pub(crate) fn from_fields(slots: Vec<Option<Field>>, names: HashMap<String, usize>) -> Self {
        let traversal = Traversal::from_indices(
            slots
                .iter()
                .flatten()
                .map(Field::index),
        );
        Self {
            fields: Rc::new(FieldTable { slots, names }),
            traversal: Rc::new(traversal),
        }
    }

    /// Returns the field at `index`, or None if the index is not present.
    #[inline]
    pub fn field_at(&self, index: usize) -> Option<&Field> {
        if self.traversal.contains(index) {
            self.fields.get(index)
        } else {
            None
        }
    }

    /// Returns the field called `name`, or None if no present field has it.
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields
            .names
            .get(name)
            .and_then(|&index| self.field_at(index))
    }

    /// Returns the index of the field called `name`.
    pub fn index_named(&self, name: &str) -> Option<usize> {
        self.field_named(name).map(Field::index)
    }

    /// Returns the name of the field at `index`.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.field_at(index).and_then(Field::name)
    }

    /// Returns the type of the field at `index`.
    pub fn type_at(&self, index: usize) -> Option<DataType> {
        self.field_at(index).map(Field::data_type)
    }

    /// Returns true if `index` is present.
    #[inline]
    pub fn has_index(&self, index: usize) -> bool {
        self.traversal.contains(index)
    }

    /// Returns true if the schema has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traversal.size() == 0
    }

    /// Iterates the present fields in ascending index order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.indices().filter_map(move |index| self.fields.get(index))
    }

    /// Returns the names of the present fields in index order. Unnamed
    /// fields are skipped.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields().filter_map(Field::name).collect()
    }

    /// Returns the index, failing with `NoSuchField` if it is not present.
    pub fn require_index(&self, index: usize) -> Result<usize> {
        if self.has_index(index) {
            Ok(index)
        } else {
            Err(Error::no_such_field(index, self))
        }
    }

    /// Returns the index of `name`, failing with `NoSuchField` if absent.
    pub fn require_named(&self, name: &str) -> Result<usize> {
        self.index_named(name)
            .ok_or_else(|| Error::no_such_field(name, self))
    }

    /// Projects this schema onto a subset of its indices, supplied in any
    /// order. Duplicates are ignored.
    pub fn project(&self, indices: &[usize]) -> Result<PartialSchema> {
        for &index in indices {
            self.require_index(index)?;
        }
        Ok(PartialSchema::new(
            self.narrowed(Traversal::from_indices(indices.iter().copied())),
            self.clone(),
        ))
    }

    /// Projects this schema onto the fields with the given names.
    pub fn project_named(&self, names: &[&str]) -> Result<PartialSchema> {
        let indices = names
            .iter()
            .map(|name| self.require_named(name))
            .collect::<Result<Vec<_>>>()?;
        self.project(&indices)
    }

    /// Number of raw value slots a record over this schema needs.
    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.fields.width()
    }

    #[inline]
    pub(crate) fn traversal(&self) -> &Rc<Traversal> {
        &self.traversal
    }

    fn narrowed(&self, traversal: Traversal) -> Self {
        Self {
            fields: Rc::clone(&self.fields),
            traversal: Rc::new(traversal),
        }
    }
}

impl IndexSequence for Schema {
    #[inline]
    fn first_index(&self) -> Option<usize> {
        self.traversal.first_index()
    }

    #[inline]
    fn next_index(&self, index: usize) -> Option<usize> {
        self.traversal.next_index(index)
    }

    #[inline]
    fn last_index(&self) -> Option<usize> {
        self.traversal.last_index()
    }

    #[inline]
    fn size(&self) -> usize {
        self.traversal.size()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.fields, &other.fields) && self.traversal == other.traversal {
            return true;
        }
        self.size() == other.size() && self.fields().eq(other.fields())
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema{}", self)
    }
}
