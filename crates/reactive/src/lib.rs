//! Dido Reactive - Change subscriptions for keyed tables.
//!
//! Every Dido table publishes three events per key: a full record was
//! upserted, a partial update was applied, or the row was deleted. This
//! crate defines the listener side of that contract and the fan-out used by
//! every publisher.
//!
//! # Core Concepts
//!
//! - `KeyedSubscriber`: receives `on_data`, `on_partial` and `on_delete`
//! - `KeyedPublisher`: anything a `KeyedSubscriber` can subscribe to
//! - `Subscription`: closeable handle returned by `subscribe`
//! - `KeyedSubscribers`: fan-out with a single-listener fast path
//! - `RecordSubscriber`: the same three events without the key
//!
//! # Example
//!
//! ```rust
//! use dido_core::{DataType, PartialUpdate, Record, Schema};
//! use dido_reactive::{KeyedSubscriber, KeyedSubscribers};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! struct Counter(Cell<usize>);
//!
//! impl KeyedSubscriber<i32> for Counter {
//!     fn on_data(&self, _key: &i32, _data: &Record) {
//!         self.0.set(self.0.get() + 1);
//!     }
//!     fn on_partial(&self, _key: &i32, _update: &PartialUpdate) {}
//!     fn on_delete(&self, _key: &i32, _data: &Record) {}
//! }
//!
//! let schema = Schema::try_from(&[("Id", DataType::Int32)][..]).unwrap();
//! let record = Record::of(&schema, vec![1.into()]).unwrap();
//!
//! let subscribers: KeyedSubscribers<i32> = KeyedSubscribers::new();
//! let counter = Rc::new(Counter(Cell::new(0)));
//! let mut subscription = subscribers.add_subscriber(counter.clone());
//!
//! subscribers.on_data(&1, &record);
//! subscription.close();
//! subscribers.on_data(&1, &record);
//!
//! assert_eq!(counter.0.get(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod subscriber;
pub mod subscription;

pub use subscriber::{KeyedPublisher, KeyedSubscriber, RecordForwarder, RecordSubscriber};
pub use subscription::{KeyedSubscribers, Subscription, SubscriptionId};
