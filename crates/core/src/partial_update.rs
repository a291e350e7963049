//! Partial updates: a record plus the indices a change touches.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::{IndexSequence, Schema, Traversal};
use crate::value::Value;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// A patch carried through change notifications.
///
/// The touched indices are iterated in ascending order regardless of the
/// order they were supplied in. A touched index whose value is unset in
/// [`PartialUpdate::data`] clears that field when the patch is applied.
#[derive(Clone)]
pub struct PartialUpdate {
    data: Record,
    indices: Rc<Traversal>,
}

impl PartialUpdate {
    /// An update touching every present index of `data`'s schema.
    pub fn of(data: Record) -> Self {
        let indices = Rc::clone(data.schema().traversal());
        Self { data, indices }
    }

    /// Starts an update over `data` whose touched indices are chosen next.
    pub fn from(data: Record) -> FieldSelection {
        FieldSelection { data }
    }

    /// Returns the record carrying the new values.
    #[inline]
    pub fn data(&self) -> &Record {
        &self.data
    }

    /// Returns true if this update touches `index`.
    #[inline]
    pub fn touches(&self, index: usize) -> bool {
        self.indices.contains(index)
    }

    /// Returns this update with its data and touched indices shifted up by
    /// `by`. Used to move a patch from a right-hand source table into the
    /// index space of a join.
    pub fn transposed(&self, by: usize) -> Result<PartialUpdate> {
        let source = self.data.schema();
        let mut builder = Schema::builder();
        for field in source.fields() {
            builder = match field.name() {
                Some(name) => builder.add_named_at(field.index() + by, name, field.data_type())?,
                None => builder.add_at(field.index() + by, field.data_type())?,
            };
        }
        let schema = builder.build();

        let mut values = vec![Value::Null; schema.width()];
        for index in source.indices() {
            if let Some(value) = self.data.value_at(index) {
                values[index + by - 1] = value.clone();
            }
        }

        Ok(Self {
            data: Record::from_parts(schema, values),
            indices: Rc::new(Traversal::from_indices(
                self.indices().map(|index| index + by),
            )),
        })
    }
}

/// Chooses the indices a [`PartialUpdate`] touches.
pub struct FieldSelection {
    data: Record,
}

impl FieldSelection {
    /// Touches exactly `indices`. Index 0 is rejected.
    pub fn with_indices(self, indices: &[usize]) -> Result<PartialUpdate> {
        if indices.contains(&0) {
            return Err(Error::no_such_field(0, self.data.schema()));
        }
        Ok(self.finish(Traversal::from_indices(indices.iter().copied())))
    }

    /// Touches the fields of `data`'s schema with the given names.
    pub fn with_names(self, names: &[&str]) -> Result<PartialUpdate> {
        let schema = self.data.schema();
        let indices = names
            .iter()
            .map(|name| schema.require_named(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.finish(Traversal::from_indices(indices)))
    }

    /// Touches the indices of another sequence.
    pub fn with_sequence(self, sequence: &impl IndexSequence) -> PartialUpdate {
        self.finish(Traversal::from_indices(sequence.indices()))
    }

    fn finish(self, traversal: Traversal) -> PartialUpdate {
        PartialUpdate {
            data: self.data,
            indices: Rc::new(traversal),
        }
    }
}

impl IndexSequence for PartialUpdate {
    #[inline]
    fn first_index(&self) -> Option<usize> {
        self.indices.first_index()
    }

    #[inline]
    fn next_index(&self, index: usize) -> Option<usize> {
        self.indices.next_index(index)
    }

    #[inline]
    fn last_index(&self) -> Option<usize> {
        self.indices.last_index()
    }

    #[inline]
    fn size(&self) -> usize {
        self.indices.size()
    }
}

impl PartialEq for PartialUpdate {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices && self.data == other.data
    }
}

impl fmt::Display for PartialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.data.schema();
        f.write_str("{")?;
        for (i, index) in self.indices().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match schema.name_at(index) {
                Some(name) => write!(f, "[{}:{}]=", index, name)?,
                None => write!(f, "[{}]=", index)?,
            }
            match self.data.value_at(index) {
                Some(value) => write!(f, "{}", value)?,
                None => f.write_str("null")?,
            }
        }
        f.write_str("}")
    }
}

impl fmt::Debug for PartialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartialUpdate{}", self)
    }
}
