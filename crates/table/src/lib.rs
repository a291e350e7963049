//! Dido Table - Live keyed tables, joins and re-keying.
//!
//! Tables hold the current full record for each key and notify subscribers
//! of every change as it happens. Derived tables listen to their sources
//! and keep themselves up to date incrementally.
//!
//! # Tables
//!
//! - `BasicTable`: mutable in-memory table fed through `Receiver`
//! - `JoinedTable`: live inner or left join, built with `DataJoin`
//! - `ForeignKeyedTable`: a reference table seen through a child's foreign key
//! - `ReKeyedTable`: a table keyed by a value computed from its rows
//!
//! # Example
//!
//! ```rust
//! use dido_core::{DataType, KeyExtractors, Record, Schema};
//! use dido_table::{BasicTable, KeyedTable, ReKeyedTable, Receiver};
//! use std::rc::Rc;
//!
//! let schema = Schema::try_from(&[("Id", DataType::String), ("Fruit", DataType::String)][..]).unwrap();
//! let fruits = Rc::new(BasicTable::<String>::with_schema(schema.clone()).create().unwrap());
//! fruits.upsert(&Record::of(&schema, vec!["F1".into(), "Apple".into()]).unwrap()).unwrap();
//!
//! let by_name = ReKeyedTable::new(
//!     fruits.clone(),
//!     KeyExtractors::named::<String>(&schema, "Fruit").unwrap(),
//! );
//! assert!(by_name.contains_key(&"Apple".to_string()));
//! ```
//!
//! Everything runs synchronously on the calling thread. A mutation returns
//! only after every downstream table and subscriber has seen it.

#![no_std]

extern crate alloc;

pub mod basic;
pub mod foreign_key;
pub mod join;
pub mod rekey;
pub mod table;

pub use basic::{BasicTable, TableSettings};
pub use foreign_key::ForeignKeyedTable;
pub use join::{DataJoin, ForeignKeyJoin, JoinFrom, JoinType, JoinedTable, PrimaryKeyJoin};
pub use rekey::ReKeyedTable;
pub use table::{Closeable, KeyedTable, Receiver, TableKey};

// Re-export commonly used types from dependencies
pub use dido_core::{PartialUpdate, Record, Schema};
pub use dido_reactive::{KeyedPublisher, KeyedSubscriber, RecordSubscriber, Subscription};
