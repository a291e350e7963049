//! Table contracts shared by every keyed table.

use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt::Debug;
use dido_core::{PartialUpdate, Record, Result, Schema};
use dido_reactive::{KeyedPublisher, RecordForwarder, RecordSubscriber, Subscription};

/// Bounds every table key satisfies.
pub trait TableKey: Ord + Clone + Debug + 'static {}

impl<T: Ord + Clone + Debug + 'static> TableKey for T {}

/// An observable mapping from key to the current full record.
///
/// Reads never notify. Entries are reported in ascending key order.
pub trait KeyedTable<K: TableKey>: KeyedPublisher<K> {
    /// The schema every row of this table conforms to.
    fn schema(&self) -> &Schema;

    fn contains_key(&self, key: &K) -> bool;

    /// Returns the current row for `key`.
    fn get(&self, key: &K) -> Option<Record>;

    fn key_set(&self) -> BTreeSet<K>;

    fn entry_set(&self) -> Vec<(K, Record)> {
        self.key_set()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|row| (key, row)))
            .collect()
    }

    /// Subscribes to this table's changes without their keys.
    fn subscribe_records(&self, subscriber: Rc<dyn RecordSubscriber>) -> Subscription {
        self.subscribe(Rc::new(RecordForwarder::new(subscriber)))
    }
}

/// The producer side of a table: where changes come in.
pub trait Receiver {
    /// Inserts a row or overwrites the fields `data` carries.
    fn upsert(&self, data: &Record) -> Result<()>;

    /// Sets or clears each index the update touches.
    fn apply_patch(&self, update: &PartialUpdate) -> Result<()>;

    /// Deletes the row whose key `key_data` carries.
    fn delete(&self, key_data: &Record) -> Result<()>;
}

/// A derived table that listens to its sources until closed.
pub trait Closeable {
    /// Stops listening to every source. Idempotent.
    fn close(&self);
}
