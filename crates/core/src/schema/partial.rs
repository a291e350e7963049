//! Partial schemas: a subset of another schema's indices.

use super::{IndexSequence, Schema};
use core::fmt;
use core::ops::Deref;

/// A schema narrowed to a subset of a full schema's indices.
///
/// Field lookups are answered by the full schema's field table, so a field
/// keeps its original index, name and type. Only the presence traversal is
/// narrowed. A partial schema over every index of its full schema is equal
/// to the full schema.
#[derive(Clone)]
pub struct PartialSchema {
    schema: Schema,
    full: Schema,
}

impl PartialSchema {
    pub(crate) fn new(schema: Schema, full: Schema) -> Self {
        Self { schema, full }
    }

    /// Returns the schema this one was projected from.
    #[inline]
    pub fn full_schema(&self) -> &Schema {
        &self.full
    }

    /// Returns the narrowed schema.
    #[inline]
    pub fn as_schema(&self) -> &Schema {
        &self.schema
    }

    /// Consumes this partial schema, returning the narrowed schema.
    #[inline]
    pub fn into_schema(self) -> Schema {
        self.schema
    }
}

impl Deref for PartialSchema {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &self.schema
    }
}

impl IndexSequence for PartialSchema {
    #[inline]
    fn first_index(&self) -> Option<usize> {
        self.schema.first_index()
    }

    #[inline]
    fn next_index(&self, index: usize) -> Option<usize> {
        self.schema.next_index(index)
    }

    #[inline]
    fn last_index(&self) -> Option<usize> {
        self.schema.last_index()
    }

    #[inline]
    fn size(&self) -> usize {
        self.schema.size()
    }
}

impl From<PartialSchema> for Schema {
    fn from(partial: PartialSchema) -> Self {
        partial.schema
    }
}

impl PartialEq for PartialSchema {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
    }
}

impl PartialEq<Schema> for PartialSchema {
    fn eq(&self, other: &Schema) -> bool {
        self.schema == *other
    }
}

impl PartialEq<PartialSchema> for Schema {
    fn eq(&self, other: &PartialSchema) -> bool {
        *self == other.schema
    }
}

impl fmt::Display for PartialSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.schema, f)
    }
}

impl fmt::Debug for PartialSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartialSchema{} of {}", self.schema, self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use alloc::vec;
    use alloc::vec::Vec;

    fn fruit_schema() -> Schema {
        Schema::builder()
            .add_named("Fruit", DataType::String)
            .unwrap()
            .add_named("Qty", DataType::Int32)
            .unwrap()
            .add_named("Price", DataType::Float64)
            .unwrap()
            .build()
    }

    #[test]
    fn test_partial_of_fields() {
        let schema = fruit_schema();
        let partial = schema.project_named(&["Fruit", "Price"]).unwrap();

        let expected = Schema::builder()
            .add_named_at(1, "Fruit", DataType::String)
            .unwrap()
            .add_named_at(3, "Price", DataType::Float64)
            .unwrap()
            .build();

        assert_eq!(partial, expected);
        assert_eq!(partial.full_schema(), &schema);
    }

    #[test]
    fn test_out_of_order_fields() {
        let schema = fruit_schema();
        let partial = schema.project_named(&["Price", "Fruit"]).unwrap();

        assert_eq!(partial.indices().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(partial.first_index(), Some(1));
        assert_eq!(partial.next_index(1), Some(3));
        assert_eq!(partial.last_index(), Some(3));
    }

    #[test]
    fn test_partial_of_same() {
        let schema = fruit_schema();
        let partial = schema.project_named(&["Fruit", "Price", "Qty"]).unwrap();
        assert_eq!(partial, schema);
        assert_eq!(schema, partial);
    }

    #[test]
    fn test_partial_of_none() {
        let schema = fruit_schema();
        let partial = schema.project(&[]).unwrap();
        assert_eq!(partial.size(), 0);
        assert_eq!(partial.first_index(), None);
        assert_eq!(partial.last_index(), None);
        assert!(partial.is_empty());
    }

    #[test]
    fn test_partial_duplicates_ignored() {
        let schema = fruit_schema();
        let partial = schema.project(&[3, 1, 3]).unwrap();
        assert_eq!(partial.size(), 2);
        assert_eq!(partial.indices().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_partial_of_partial() {
        let schema = fruit_schema();
        let partial = schema.project(&[1, 3]).unwrap();
        let narrower = partial.project(&[3]).unwrap();
        assert_eq!(narrower.field_at(3), schema.field_at(3));
        assert!(partial.project(&[2]).is_err());
    }
}
