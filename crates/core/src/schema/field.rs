//! Field definition for Dido schemas.

use crate::types::DataType;
use alloc::string::String;
use core::fmt;

/// A named, typed slot in a schema.
///
/// The index is 1-based and stable: projecting or concatenating schemas never
/// renumbers the field within the schema it was defined in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    index: usize,
    name: Option<String>,
    data_type: DataType,
}

impl Field {
    pub(crate) fn new(index: usize, name: Option<String>, data_type: DataType) -> Self {
        Self {
            index,
            name,
            data_type,
        }
    }

    /// Returns the 1-based field index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the field name, if it has one.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns a copy of this field moved to another index.
    pub(crate) fn at_index(&self, index: usize, name: Option<String>) -> Self {
        Self {
            index,
            name,
            data_type: self.data_type,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "[{}:{}]={}", self.index, name, self.data_type),
            None => write!(f, "[{}]={}", self.index, self.data_type),
        }
    }
}
