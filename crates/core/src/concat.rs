//! Concatenation of records from two schemas.

use crate::error::Result;
use crate::record::Record;
use crate::schema::{IndexSequence, Schema};
use crate::value::Value;
use alloc::vec;

/// Joins records of a left and a right schema into records of their
/// concatenated schema.
///
/// Right-hand indices are shifted by the left schema's last index. Values
/// are read leniently: a field the given record does not carry is left
/// unset, so a key-only record can stand in for a full row.
#[derive(Clone, Debug)]
pub struct Concatenator {
    left: Schema,
    right: Schema,
    schema: Schema,
    offset: usize,
}

impl Concatenator {
    pub fn from_schemas(left: &Schema, right: &Schema) -> Result<Self> {
        Ok(Self {
            left: left.clone(),
            right: right.clone(),
            schema: left.concat(right)?,
            offset: left.last_index().unwrap_or(0),
        })
    }

    /// The concatenated schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn left_schema(&self) -> &Schema {
        &self.left
    }

    #[inline]
    pub fn right_schema(&self) -> &Schema {
        &self.right
    }

    /// The shift applied to right-hand indices.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn concat(&self, left: &Record, right: &Record) -> Record {
        let mut values = vec![Value::Null; self.schema.width()];
        for index in self.left.indices() {
            if let Some(value) = left.value_at(index) {
                values[index - 1] = value.clone();
            }
        }
        for index in self.right.indices() {
            if let Some(value) = right.value_at(index) {
                values[index + self.offset - 1] = value.clone();
            }
        }
        Record::from_parts(self.schema.clone(), values)
    }

    /// An all-unset record of the right schema.
    pub fn empty_right(&self) -> Record {
        Record::empty(&self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use alloc::string::ToString;

    fn fruit() -> Schema {
        Schema::try_from(
            &[
                ("Id", DataType::String),
                ("Fruit", DataType::String),
                ("GrocerId", DataType::String),
            ][..],
        )
        .unwrap()
    }

    fn grocer() -> Schema {
        Schema::try_from(&[("Id", DataType::String), ("Name", DataType::String)][..]).unwrap()
    }

    #[test]
    fn test_concat_rows() {
        let concatenator = Concatenator::from_schemas(&fruit(), &grocer()).unwrap();
        let left = Record::of(&fruit(), vec!["F1".into(), "Apple".into(), "G2".into()]).unwrap();
        let right = Record::of(&grocer(), vec!["G2".into(), "Smith".into()]).unwrap();

        let joined = concatenator.concat(&left, &right);
        assert_eq!(concatenator.offset(), 3);
        assert_eq!(
            joined.to_string(),
            "{[1:Id]=F1, [2:Fruit]=Apple, [3:GrocerId]=G2, [4:Id_]=G2, [5:Name]=Smith}"
        );
    }

    #[test]
    fn test_concat_empty_right() {
        let concatenator = Concatenator::from_schemas(&fruit(), &grocer()).unwrap();
        let left = Record::of(&fruit(), vec!["F3".into(), "Pear".into(), "G9".into()]).unwrap();

        let joined = concatenator.concat(&left, &concatenator.empty_right());
        assert!(joined.has_at(2));
        assert!(!joined.has_at(4));
        assert!(!joined.has_at(5));
        assert_eq!(joined.schema().size(), 5);
    }

    #[test]
    fn test_concat_key_only_left() {
        let concatenator = Concatenator::from_schemas(&fruit(), &grocer()).unwrap();
        let key = Record::of(&fruit(), vec!["F1".into(), "Apple".into(), "G2".into()])
            .unwrap()
            .project(&[1])
            .unwrap();
        let right = Record::of(&grocer(), vec!["G2".into(), "Smith".into()]).unwrap();

        let joined = concatenator.concat(&key, &right);
        assert_eq!(joined.value_at(1), Some(&Value::from("F1")));
        assert!(!joined.has_at(2));
        assert_eq!(joined.value_at(5), Some(&Value::from("Smith")));
    }
}
