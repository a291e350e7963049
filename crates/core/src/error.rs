//! Error types for Dido.

use crate::types::DataType;
use alloc::string::String;
use core::fmt;

/// Result type alias for Dido operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for schema, record and table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A field index or name is not present in a schema.
    NoSuchField {
        field: String,
        schema: String,
    },
    /// A patch or delete targeted a key with no current row.
    NoRowForKey {
        table: String,
        key: String,
    },
    /// Type mismatch between a value and its field.
    TypeMismatch {
        index: usize,
        expected: DataType,
        got: DataType,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
    /// A key could not be extracted from a record, or a key mapping no
    /// longer agrees with itself. `index` is 0 when no single field is at
    /// fault.
    InvalidKey {
        index: usize,
        message: String,
    },
    /// Record values do not line up with the schema.
    InvalidRecord {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoSuchField { field, schema } => {
                write!(f, "No field {} in schema {}", field, schema)
            }
            Error::NoRowForKey { table, key } => {
                write!(f, "No row for key {} in table {}", key, table)
            }
            Error::TypeMismatch {
                index,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Type mismatch at index {}: expected {}, got {}",
                    index, expected, got
                )
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            Error::InvalidKey { index, message } => {
                write!(f, "Invalid key at index {}: {}", index, message)
            }
            Error::InvalidRecord { message } => {
                write!(f, "Invalid record: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a no such field error.
    pub fn no_such_field(field: impl fmt::Display, schema: impl fmt::Display) -> Self {
        Error::NoSuchField {
            field: alloc::format!("{}", field),
            schema: alloc::format!("{}", schema),
        }
    }

    /// Creates a no row for key error. The key is rendered with `Debug`.
    pub fn no_row_for_key(table: impl Into<String>, key: &impl fmt::Debug) -> Self {
        Error::NoRowForKey {
            table: table.into(),
            key: alloc::format!("{:?}", key),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(index: usize, expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch {
            index,
            expected,
            got,
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(index: usize, message: impl Into<String>) -> Self {
        Error::InvalidKey {
            index,
            message: message.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Error::InvalidRecord {
            message: message.into(),
        }
    }
}
