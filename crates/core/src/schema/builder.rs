//! Builder for Dido schemas.

use super::field::Field;
use super::Schema;
use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Builder for creating schemas.
///
/// Fields added without an explicit index take the index after the largest
/// one so far.
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    names: HashMap<String, usize>,
    last: usize,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder holding every field of `schema`.
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let mut builder = Self::new();
        for field in schema.fields() {
            builder = builder.add_field(field.clone())?;
        }
        Ok(builder)
    }

    /// Adds a named field at the next index.
    pub fn add_named(self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let index = self.last + 1;
        self.add_named_at(index, name, data_type)
    }

    /// Adds a named field at an explicit index.
    pub fn add_named_at(
        self,
        index: usize,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Result<Self> {
        self.add_field(Field::new(index, Some(name.into()), data_type))
    }

    /// Adds an unnamed field at the next index.
    pub fn add(self, data_type: DataType) -> Result<Self> {
        let index = self.last + 1;
        self.add_at(index, data_type)
    }

    /// Adds an unnamed field at an explicit index.
    pub fn add_at(self, index: usize, data_type: DataType) -> Result<Self> {
        self.add_field(Field::new(index, None, data_type))
    }

    /// Appends every field of `other`, shifting its indices past the largest
    /// index added so far. A name already in use gets `_` appended until it
    /// is unique.
    pub fn concat(mut self, other: &Schema) -> Result<Self> {
        let offset = self.last;
        for field in other.fields() {
            let name = field.name().map(|name| {
                let mut unique = String::from(name);
                while self.names.contains_key(&unique) {
                    unique.push('_');
                }
                unique
            });
            self = self.add_field(field.at_index(field.index() + offset, name))?;
        }
        Ok(self)
    }

    fn add_field(mut self, field: Field) -> Result<Self> {
        let index = field.index();
        if index == 0 {
            return Err(Error::invalid_schema("Field index must be positive"));
        }
        if self.fields.iter().any(|f| f.index() == index) {
            return Err(Error::invalid_schema(format!(
                "Field index already exists: {}",
                index
            )));
        }
        if let Some(name) = field.name() {
            if self.names.contains_key(name) {
                return Err(Error::invalid_schema(format!(
                    "Field name already exists: {}",
                    name
                )));
            }
            self.names.insert(String::from(name), index);
        }
        self.last = self.last.max(index);
        self.fields.push(field);
        Ok(self)
    }

    /// Builds the schema.
    pub fn build(self) -> Schema {
        let mut slots: Vec<Option<Field>> = (0..self.last).map(|_| None).collect();
        for field in self.fields {
            let slot = field.index() - 1;
            slots[slot] = Some(field);
        }
        Schema::from_fields(slots, self.names)
    }
}

/// Builds a schema from `(name, type)` pairs at indices 1, 2, ...
impl TryFrom<&[(&str, DataType)]> for Schema {
    type Error = Error;

    fn try_from(fields: &[(&str, DataType)]) -> Result<Self> {
        fields
            .iter()
            .try_fold(SchemaBuilder::new(), |builder, &(name, data_type)| {
                builder.add_named(name, data_type)
            })
            .map(SchemaBuilder::build)
    }
}

impl Schema {
    /// Returns the schema of `self` followed by `other`, with `other`'s
    /// indices shifted by this schema's last index.
    pub fn concat(&self, other: &Schema) -> Result<Schema> {
        Ok(SchemaBuilder::from_schema(self)?.concat(other)?.build())
    }
}
