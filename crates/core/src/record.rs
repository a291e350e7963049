//! Records: immutable values conforming to a schema.
//!
//! A [`Record`] stores its values in slots addressed by raw field index, so
//! a record projected onto a [`PartialSchema`](crate::schema::PartialSchema)
//! shares its values with the original and keeps every field's index.
//! [`RowBuffer`] is the mutable counterpart used by tables to hold the
//! current state of a row.

use crate::error::{Error, Result};
use crate::partial_update::PartialUpdate;
use crate::schema::{IndexSequence, Schema};
use crate::value::Value;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// An immutable record.
#[derive(Clone)]
pub struct Record {
    schema: Schema,
    /// `values[i - 1]` holds the value at index `i`. Unset fields are Null.
    values: Rc<Vec<Value>>,
}

impl Record {
    /// Creates a record from values given in the schema's index order.
    pub fn of(schema: &Schema, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.size() {
            return Err(Error::invalid_record(format!(
                "expected {} values for schema {}, got {}",
                schema.size(),
                schema,
                values.len()
            )));
        }
        let mut slots = vec![Value::Null; schema.width()];
        for (index, value) in schema.indices().zip(values) {
            check_type(schema, index, &value)?;
            slots[index - 1] = value;
        }
        Ok(Self::from_parts(schema.clone(), slots))
    }

    /// Starts building a record field by field.
    pub fn builder(schema: &Schema) -> RecordBuilder {
        RecordBuilder {
            buffer: RowBuffer::new(schema),
        }
    }

    /// A record with every field of `schema` unset.
    pub fn empty(schema: &Schema) -> Self {
        Self::from_parts(schema.clone(), vec![Value::Null; schema.width()])
    }

    pub(crate) fn from_parts(schema: Schema, values: Vec<Value>) -> Self {
        Self {
            schema,
            values: Rc::new(values),
        }
    }

    /// Returns the record's schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the value at `index`: `Ok(None)` if the field is present but
    /// unset, `NoSuchField` if the schema has no such index.
    pub fn get_at(&self, index: usize) -> Result<Option<&Value>> {
        self.schema.require_index(index)?;
        Ok(self.slot(index))
    }

    /// Returns the value of the field called `name`.
    pub fn get_named(&self, name: &str) -> Result<Option<&Value>> {
        let index = self.schema.require_named(name)?;
        Ok(self.slot(index))
    }

    /// Returns true if the field at `index` is present and set.
    #[inline]
    pub fn has_at(&self, index: usize) -> bool {
        self.value_at(index).is_some()
    }

    /// Returns true if the field called `name` is present and set.
    pub fn has_named(&self, name: &str) -> bool {
        self.schema
            .index_named(name)
            .map_or(false, |index| self.has_at(index))
    }

    /// Returns the value at `index` if the field is present and set.
    #[inline]
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        if self.schema.has_index(index) {
            self.slot(index)
        } else {
            None
        }
    }

    /// Projects this record onto a subset of its indices. The result shares
    /// values with this record.
    pub fn project(&self, indices: &[usize]) -> Result<Record> {
        let partial = self.schema.project(indices)?;
        Ok(Self {
            schema: partial.into_schema(),
            values: Rc::clone(&self.values),
        })
    }

    /// Projects this record onto the fields with the given names.
    pub fn project_named(&self, names: &[&str]) -> Result<Record> {
        let partial = self.schema.project_named(names)?;
        Ok(Self {
            schema: partial.into_schema(),
            values: Rc::clone(&self.values),
        })
    }

    /// Returns the present values in index order.
    pub fn values(&self) -> Vec<Value> {
        self.schema
            .indices()
            .map(|index| self.values[index - 1].clone())
            .collect()
    }

    #[inline]
    fn slot(&self, index: usize) -> Option<&Value> {
        match self.values.get(index.wrapping_sub(1)) {
            Some(value) if !value.is_null() => Some(value),
            _ => None,
        }
    }
}

fn check_type(schema: &Schema, index: usize, value: &Value) -> Result<()> {
    match (schema.type_at(index), value.data_type()) {
        (Some(expected), Some(got)) if expected != got => {
            Err(Error::type_mismatch(index, expected, got))
        }
        _ => Ok(()),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self
                .schema
                .indices()
                .zip(other.schema.indices())
                .all(|(a, b)| self.slot(a) == other.slot(b))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, index) in self.schema.indices().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self.schema.name_at(index) {
                Some(name) => write!(f, "[{}:{}]=", index, name)?,
                None => write!(f, "[{}]=", index)?,
            }
            match self.slot(index) {
                Some(value) => write!(f, "{}", value)?,
                None => f.write_str("null")?,
            }
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Builds a [`Record`] one field at a time.
pub struct RecordBuilder {
    buffer: RowBuffer,
}

impl RecordBuilder {
    /// Sets the value at `index`.
    pub fn set_at(mut self, index: usize, value: impl Into<Value>) -> Result<Self> {
        self.buffer.set_at(index, value.into())?;
        Ok(self)
    }

    /// Sets the value of the field called `name`.
    pub fn set_named(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let index = self.buffer.schema.require_named(name)?;
        self.buffer.set_at(index, value.into())?;
        Ok(self)
    }

    /// Builds the record.
    pub fn build(self) -> Record {
        self.buffer.to_record()
    }
}

/// The mutable state of a row. Snapshots taken with [`RowBuffer::to_record`]
/// share storage until the buffer is next written.
#[derive(Clone, Debug)]
pub struct RowBuffer {
    schema: Schema,
    values: Rc<Vec<Value>>,
}

impl RowBuffer {
    /// A buffer with every field unset.
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            values: Rc::new(vec![Value::Null; schema.width()]),
        }
    }

    /// A buffer over `schema` seeded with the values `record` holds for the
    /// same indices.
    pub fn copy_of(schema: &Schema, record: &Record) -> Result<Self> {
        let mut buffer = Self::new(schema);
        buffer.copy_from(record)?;
        Ok(buffer)
    }

    /// Returns the buffer's schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sets the value at `index`. Setting Null clears the field.
    pub fn set_at(&mut self, index: usize, value: Value) -> Result<()> {
        self.schema.require_index(index)?;
        check_type(&self.schema, index, &value)?;
        Rc::make_mut(&mut self.values)[index - 1] = value;
        Ok(())
    }

    /// Clears the value at `index`.
    pub fn clear_at(&mut self, index: usize) -> Result<()> {
        self.schema.require_index(index)?;
        Rc::make_mut(&mut self.values)[index - 1] = Value::Null;
        Ok(())
    }

    /// Overwrites every field of `record`'s schema, setting or clearing it.
    /// Fields outside `record`'s schema keep their values. Nothing is
    /// written unless every field of `record` fits this buffer's schema.
    pub fn copy_from(&mut self, record: &Record) -> Result<()> {
        for index in record.schema().indices() {
            self.check(index, record.value_at(index))?;
        }
        let values = Rc::make_mut(&mut self.values);
        for index in record.schema().indices() {
            values[index - 1] = record.value_at(index).cloned().unwrap_or_default();
        }
        Ok(())
    }

    /// Applies a partial update: each touched index is set from the
    /// update's data, or cleared if the data leaves it unset. Nothing is
    /// written unless every touched index fits this buffer's schema.
    pub fn apply(&mut self, update: &PartialUpdate) -> Result<()> {
        let data = update.data();
        for index in update.indices() {
            self.check(index, data.value_at(index))?;
        }
        let values = Rc::make_mut(&mut self.values);
        for index in update.indices() {
            values[index - 1] = data.value_at(index).cloned().unwrap_or_default();
        }
        Ok(())
    }

    fn check(&self, index: usize, value: Option<&Value>) -> Result<()> {
        self.schema.require_index(index)?;
        match value {
            Some(value) => check_type(&self.schema, index, value),
            None => Ok(()),
        }
    }

    /// Takes a snapshot of the buffer.
    pub fn to_record(&self) -> Record {
        Record {
            schema: self.schema.clone(),
            values: Rc::clone(&self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::DataType;
    use alloc::string::ToString;

    fn fruit_schema() -> Schema {
        Schema::try_from(
            &[
                ("Fruit", DataType::String),
                ("Qty", DataType::Int32),
                ("Price", DataType::Float64),
            ][..],
        )
        .unwrap()
    }

    fn apple() -> Record {
        Record::of(&fruit_schema(), vec!["Apple".into(), 10.into(), 23.5.into()]).unwrap()
    }

    #[test]
    fn test_record_of() {
        let record = apple();
        assert_eq!(record.get_at(1).unwrap(), Some(&Value::from("Apple")));
        assert_eq!(record.get_named("Qty").unwrap(), Some(&Value::Int32(10)));
        assert!(record.has_at(3));
        assert_eq!(record.values().len(), 3);
    }

    #[test]
    fn test_record_of_wrong_arity() {
        let result = Record::of(&fruit_schema(), vec!["Apple".into()]);
        assert!(matches!(result, Err(Error::InvalidRecord { .. })));
    }

    #[test]
    fn test_record_of_wrong_type() {
        let result = Record::of(&fruit_schema(), vec!["Apple".into(), "ten".into(), 1.0.into()]);
        assert!(matches!(result, Err(Error::TypeMismatch { index: 2, .. })));
    }

    #[test]
    fn test_get_absent_vs_missing() {
        let record = Record::builder(&fruit_schema())
            .set_named("Fruit", "Pear")
            .unwrap()
            .build();

        assert_eq!(record.get_at(2).unwrap(), None);
        assert!(!record.has_at(2));
        assert!(matches!(record.get_at(4), Err(Error::NoSuchField { .. })));
        assert!(matches!(record.get_at(0), Err(Error::NoSuchField { .. })));
        assert!(matches!(record.get_named("Colour"), Err(Error::NoSuchField { .. })));
    }

    #[test]
    fn test_partial_record() {
        let partial = apple().project_named(&["Fruit", "Price"]).unwrap();

        assert_eq!(partial.schema().size(), 2);
        assert_eq!(partial.schema().name_at(1), Some("Fruit"));
        assert_eq!(partial.schema().name_at(3), Some("Price"));
        assert!(!partial.schema().has_index(2));
        assert!(matches!(partial.get_at(2), Err(Error::NoSuchField { .. })));
        assert_eq!(partial.to_string(), "{[1:Fruit]=Apple, [3:Price]=23.5}");
    }

    #[test]
    fn test_record_equality() {
        assert_eq!(apple(), apple());

        let other = Record::of(&fruit_schema(), vec!["Apple".into(), 11.into(), 23.5.into()])
            .unwrap();
        assert_ne!(apple(), other);

        let gapped = Schema::builder()
            .add_named_at(1, "Fruit", DataType::String)
            .unwrap()
            .add_named_at(3, "Price", DataType::Float64)
            .unwrap()
            .build();
        let expected = Record::of(&gapped, vec!["Apple".into(), 23.5.into()]).unwrap();
        assert_eq!(apple().project(&[3, 1]).unwrap(), expected);
    }

    #[test]
    fn test_record_display() {
        assert_eq!(
            apple().to_string(),
            "{[1:Fruit]=Apple, [2:Qty]=10, [3:Price]=23.5}"
        );
        assert_eq!(
            Record::empty(&fruit_schema()).to_string(),
            "{[1:Fruit]=null, [2:Qty]=null, [3:Price]=null}"
        );
    }

    #[test]
    fn test_row_buffer_copy_on_write() {
        let mut buffer = RowBuffer::copy_of(&fruit_schema(), &apple()).unwrap();
        let before = buffer.to_record();

        buffer.set_at(2, Value::Int32(3)).unwrap();
        buffer.clear_at(3).unwrap();

        assert_eq!(before, apple());
        let after = buffer.to_record();
        assert_eq!(after.get_at(2).unwrap(), Some(&Value::Int32(3)));
        assert_eq!(after.get_at(3).unwrap(), None);
    }

    #[test]
    fn test_row_buffer_copy_from_partial() {
        let mut buffer = RowBuffer::copy_of(&fruit_schema(), &apple()).unwrap();
        let patch = Record::of(&fruit_schema(), vec!["Grape".into(), 1.into(), Value::Null])
            .unwrap()
            .project(&[1, 3])
            .unwrap();

        buffer.copy_from(&patch).unwrap();
        let row = buffer.to_record();
        assert_eq!(row.get_at(1).unwrap(), Some(&Value::from("Grape")));
        assert_eq!(row.get_at(2).unwrap(), Some(&Value::Int32(10)));
        assert_eq!(row.get_at(3).unwrap(), None);
    }

    #[test]
    fn test_row_buffer_apply_patch() {
        let mut buffer = RowBuffer::copy_of(&fruit_schema(), &apple()).unwrap();
        let data = Record::builder(&fruit_schema())
            .set_at(1, "Apple")
            .unwrap()
            .set_at(2, 4)
            .unwrap()
            .build();

        buffer
            .apply(&PartialUpdate::from(data).with_indices(&[2, 3]).unwrap())
            .unwrap();
        let row = buffer.to_record();
        assert_eq!(row.get_at(2).unwrap(), Some(&Value::Int32(4)));
        assert_eq!(row.get_at(3).unwrap(), None);
    }

    #[test]
    fn test_row_buffer_apply_is_all_or_nothing() {
        let mut buffer = RowBuffer::copy_of(&fruit_schema(), &apple()).unwrap();
        let update = PartialUpdate::from(Record::empty(&fruit_schema()))
            .with_indices(&[2, 9])
            .unwrap();

        assert!(matches!(
            buffer.apply(&update),
            Err(Error::NoSuchField { .. })
        ));
        assert_eq!(buffer.to_record(), apple());
    }

    #[test]
    fn test_row_buffer_rejects_foreign_fields() {
        let other = Schema::try_from(&[("Colour", DataType::String)][..]).unwrap();
        let wide = Schema::builder()
            .add_named_at(5, "Colour", DataType::String)
            .unwrap()
            .build();
        let colour = Record::of(&wide, vec!["Red".into()]).unwrap();

        assert!(RowBuffer::copy_of(&other, &colour).is_err());
    }

    #[test]
    fn test_row_buffer_rejects_bad_writes() {
        let mut buffer = RowBuffer::new(&fruit_schema());
        assert!(matches!(
            buffer.set_at(5, Value::Int32(1)),
            Err(Error::NoSuchField { .. })
        ));
        assert!(matches!(
            buffer.set_at(1, Value::Int32(1)),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
