//! Key extraction from records.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::{IndexSequence, Schema};
use crate::value::FromValue;
use alloc::format;
use core::fmt;
use core::marker::PhantomData;

/// Computes the key of a record.
pub trait KeyExtractor<K> {
    fn key_of(&self, record: &Record) -> Result<K>;
}

impl<K, F> KeyExtractor<K> for F
where
    F: Fn(&Record) -> Result<K>,
{
    fn key_of(&self, record: &Record) -> Result<K> {
        self(record)
    }
}

/// Reads the key from a single field.
pub struct FieldKey<K> {
    index: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K> FieldKey<K> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<K> Clone for FieldKey<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for FieldKey<K> {}

impl<K> fmt::Debug for FieldKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldKey[{}]", self.index)
    }
}

impl<K: FromValue> KeyExtractor<K> for FieldKey<K> {
    fn key_of(&self, record: &Record) -> Result<K> {
        let value = record
            .value_at(self.index)
            .ok_or_else(|| Error::invalid_key(self.index, "key field is unset"))?;
        K::from_value(value).ok_or_else(|| {
            Error::invalid_key(
                self.index,
                format!("cannot build key from value {}", value),
            )
        })
    }
}

/// Constructors for the common key extractors.
pub struct KeyExtractors;

impl KeyExtractors {
    /// Keys by the first present field of `schema`.
    pub fn first_field<K: FromValue>(schema: &Schema) -> Result<FieldKey<K>> {
        schema
            .first_index()
            .map(Self::at)
            .ok_or_else(|| Error::invalid_schema("cannot key a schema with no fields"))
    }

    /// Keys by the field called `name`.
    pub fn named<K: FromValue>(schema: &Schema, name: &str) -> Result<FieldKey<K>> {
        schema.require_named(name).map(Self::at)
    }

    /// Keys by the field at `index`.
    pub fn at<K: FromValue>(index: usize) -> FieldKey<K> {
        FieldKey {
            index,
            _key: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use crate::value::Value;
    use alloc::string::String;
    use alloc::vec;

    fn schema() -> Schema {
        Schema::try_from(
            &[
                ("Id", DataType::Int32),
                ("Fruit", DataType::String),
                ("Ripe", DataType::Boolean),
            ][..],
        )
        .unwrap()
    }

    #[test]
    fn test_first_field() {
        let record = Record::of(&schema(), vec![7.into(), "Kiwi".into(), true.into()]).unwrap();
        let key = KeyExtractors::first_field::<i32>(&schema()).unwrap();
        assert_eq!(key.key_of(&record), Ok(7));

        let wide = KeyExtractors::first_field::<i64>(&schema()).unwrap();
        assert_eq!(wide.key_of(&record), Ok(7));
    }

    #[test]
    fn test_named() {
        let record = Record::of(&schema(), vec![7.into(), "Kiwi".into(), true.into()]).unwrap();
        let key = KeyExtractors::named::<String>(&schema(), "Fruit").unwrap();
        assert_eq!(key.key_of(&record), Ok(String::from("Kiwi")));
        assert_eq!(
            KeyExtractors::named::<bool>(&schema(), "Ripe")
                .unwrap()
                .key_of(&record),
            Ok(true)
        );
        assert!(KeyExtractors::named::<String>(&schema(), "Colour").is_err());
    }

    #[test]
    fn test_invalid_key() {
        let unset = Record::empty(&schema());
        let key = KeyExtractors::at::<i32>(1);
        assert!(matches!(
            key.key_of(&unset),
            Err(Error::InvalidKey { index: 1, .. })
        ));

        let record = Record::of(&schema(), vec![7.into(), "Kiwi".into(), true.into()]).unwrap();
        let wrong_type = KeyExtractors::at::<i32>(2);
        assert!(matches!(
            wrong_type.key_of(&record),
            Err(Error::InvalidKey { index: 2, .. })
        ));
    }

    #[test]
    fn test_closure_extractor() {
        let record = Record::of(&schema(), vec![7.into(), "Kiwi".into(), true.into()]).unwrap();
        let extractor = |r: &Record| -> Result<i32> {
            Ok(r.value_at(1).and_then(Value::as_i32).unwrap_or(0) * 2)
        };
        assert_eq!(extractor.key_of(&record), Ok(14));
    }

    #[test]
    fn test_empty_schema_has_no_first_field() {
        let result = KeyExtractors::first_field::<Value>(&Schema::empty());
        assert!(matches!(result, Err(Error::InvalidSchema { .. })));
    }
}
