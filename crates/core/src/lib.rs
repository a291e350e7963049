//! Dido Core - Schemas, sparse records and partial updates.
//!
//! This crate provides the data model shared by every Dido live table:
//!
//! - `DataType` / `Value`: field types and runtime values
//! - `schema`: schemas with stable 1-based field indices, partial schemas
//!   projected onto a subset of those indices, and the `IndexSequence`
//!   traversal they share
//! - `Record`: immutable values conforming to a schema, plus `RowBuffer`
//! - `PartialUpdate`: a record paired with the indices a change touches
//! - `Concatenator`: the record layout of a join
//! - `KeyExtractor`: how a table computes a row's key
//! - `Error`: error types for schema, record and table operations
//!
//! # Example
//!
//! ```rust
//! use dido_core::{DataType, Record, Value};
//! use dido_core::schema::{IndexSequence, Schema};
//!
//! let schema = Schema::builder()
//!     .add_named("Fruit", DataType::String)
//!     .unwrap()
//!     .add_named("Qty", DataType::Int32)
//!     .unwrap()
//!     .add_named("Price", DataType::Float64)
//!     .unwrap()
//!     .build();
//!
//! let apple = Record::of(&schema, vec!["Apple".into(), 10.into(), 23.5.into()]).unwrap();
//! let partial = apple.project_named(&["Fruit", "Price"]).unwrap();
//!
//! assert_eq!(partial.schema().indices().collect::<Vec<_>>(), vec![1, 3]);
//! assert_eq!(partial.get_at(3).unwrap(), Some(&Value::Float64(23.5)));
//! assert_eq!(partial.to_string(), "{[1:Fruit]=Apple, [3:Price]=23.5}");
//! ```

#![no_std]

extern crate alloc;

mod concat;
mod error;
mod key;
mod partial_update;
mod record;
pub mod schema;
mod types;
mod value;

pub use concat::Concatenator;
pub use error::{Error, Result};
pub use key::{FieldKey, KeyExtractor, KeyExtractors};
pub use partial_update::{FieldSelection, PartialUpdate};
pub use record::{Record, RecordBuilder, RowBuffer};
pub use schema::{IndexSequence, PartialSchema, Schema};
pub use types::DataType;
pub use value::{FromValue, Value};
