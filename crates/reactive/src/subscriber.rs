//! Listener traits for keyed change events.

use crate::subscription::Subscription;
use alloc::rc::Rc;
use dido_core::{PartialUpdate, Record};

/// Receives the change events of a keyed table.
///
/// Callbacks run synchronously on the thread that mutated the source.
/// Mutating the source table from inside one of its own callbacks is left
/// to the caller.
pub trait KeyedSubscriber<K> {
    /// A full record was upserted for `key`.
    fn on_data(&self, key: &K, data: &Record);

    /// A partial update was applied to the row for `key`.
    fn on_partial(&self, key: &K, update: &PartialUpdate);

    /// The row for `key` was deleted. `data` is the record the delete
    /// was issued with, which may carry only the key fields.
    fn on_delete(&self, key: &K, data: &Record);
}

/// Something a [`KeyedSubscriber`] can listen to.
pub trait KeyedPublisher<K> {
    /// Adds `subscriber`. Closing the returned handle removes it again.
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K>>) -> Subscription;
}

/// Receives change events without their keys.
pub trait RecordSubscriber {
    fn on_data(&self, data: &Record);

    fn on_partial(&self, update: &PartialUpdate);

    fn on_delete(&self, data: &Record);
}

/// Forwards keyed events to a [`RecordSubscriber`], dropping the key.
pub struct RecordForwarder {
    target: Rc<dyn RecordSubscriber>,
}

impl RecordForwarder {
    pub fn new(target: Rc<dyn RecordSubscriber>) -> Self {
        Self { target }
    }
}

impl<K> KeyedSubscriber<K> for RecordForwarder {
    fn on_data(&self, _key: &K, data: &Record) {
        self.target.on_data(data);
    }

    fn on_partial(&self, _key: &K, update: &PartialUpdate) {
        self.target.on_partial(update);
    }

    fn on_delete(&self, _key: &K, data: &Record) {
        self.target.on_delete(data);
    }
}
