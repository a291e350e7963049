//! Re-keying a table by a key computed from its rows.
//!
//! Several source rows may compute the same derived key. One of them is
//! active and backs the derived row; the others are shadowed, oldest
//! first. When the active row goes away the oldest shadowed row is promoted
//! and the derived key survives.

use crate::table::{Closeable, KeyedTable, TableKey};
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use dido_core::{KeyExtractor, PartialUpdate, Record, Schema};
use dido_reactive::{KeyedPublisher, KeyedSubscriber, KeyedSubscribers, Subscription};
use tracing::{debug, trace, warn};

/// What detaching a source key did to its derived key.
#[derive(Debug, PartialEq, Eq)]
enum Detached<K, S> {
    /// The source key was active and `promoted` now backs `key`.
    Promoted { key: K, promoted: S },
    /// The source key was the last contributor to `key`.
    Removed { key: K },
    /// The source key was shadowed; the derived row is unchanged.
    Shadowed,
}

#[derive(Debug)]
struct RekeyMaps<K, S> {
    mapping_to: BTreeMap<K, S>,
    mapping_from: BTreeMap<S, K>,
    shadow: BTreeMap<K, Vec<S>>,
}

impl<K: TableKey, S: TableKey> RekeyMaps<K, S> {
    fn new() -> Self {
        Self {
            mapping_to: BTreeMap::new(),
            mapping_from: BTreeMap::new(),
            shadow: BTreeMap::new(),
        }
    }

    /// Makes `source` the active contributor to `key`. The previously
    /// active contributor, if any, is shadowed.
    fn attach(&mut self, source: &S, key: &K) {
        self.remove_shadowed(key, source);
        self.mapping_from.insert(source.clone(), key.clone());
        match self.mapping_to.insert(key.clone(), source.clone()) {
            Some(previous) if previous != *source => {
                trace!(key = ?key, shadowed = ?previous, "source row shadowed");
                let shadowed = self.shadow.entry(key.clone()).or_default();
                if !shadowed.contains(&previous) {
                    shadowed.push(previous);
                }
            }
            _ => {}
        }
    }

    /// Removes `source` from the maps. None if it was not mapped.
    fn detach(&mut self, source: &S) -> Option<Detached<K, S>> {
        let key = self.mapping_from.remove(source)?;
        if self.mapping_to.get(&key) != Some(source) {
            if !self.remove_shadowed(&key, source) {
                panic!(
                    "re-key maps out of sync: {:?} maps to {:?} but is neither active nor shadowed",
                    source, key
                );
            }
            return Some(Detached::Shadowed);
        }

        let promoted = match self.shadow.get_mut(&key) {
            Some(shadowed) if !shadowed.is_empty() => Some(shadowed.remove(0)),
            _ => None,
        };
        if self.shadow.get(&key).map_or(false, Vec::is_empty) {
            self.shadow.remove(&key);
        }
        match promoted {
            Some(promoted) => {
                self.mapping_to.insert(key.clone(), promoted.clone());
                Some(Detached::Promoted { key, promoted })
            }
            None => {
                self.mapping_to.remove(&key);
                Some(Detached::Removed { key })
            }
        }
    }

    fn remove_shadowed(&mut self, key: &K, source: &S) -> bool {
        let Some(shadowed) = self.shadow.get_mut(key) else {
            return false;
        };
        let before = shadowed.len();
        shadowed.retain(|s| s != source);
        let removed = shadowed.len() != before;
        if shadowed.is_empty() {
            self.shadow.remove(key);
        }
        removed
    }

    fn is_active(&self, source: &S) -> bool {
        self.mapping_from
            .get(source)
            .and_then(|key| self.mapping_to.get(key))
            == Some(source)
    }
}

struct RekeyState<K: TableKey, S: TableKey> {
    source: Rc<dyn KeyedTable<S>>,
    key_extractor: Box<dyn KeyExtractor<K>>,
    maps: RefCell<RekeyMaps<K, S>>,
    subscribers: KeyedSubscribers<K>,
}

impl<K: TableKey, S: TableKey> RekeyState<K, S> {
    fn current_row(&self, source: &S, fallback: &Record) -> Record {
        self.source
            .get(source)
            .unwrap_or_else(|| fallback.clone())
    }

    /// Publishes the effect of a detach. Runs with the maps released.
    ///
    /// A promoted source key whose row has vanished without an event is
    /// detached in turn, until a live row or no contributor is left.
    fn publish_detached(&self, detached: Detached<K, S>, data: &Record) {
        let mut next = Some(detached);
        while let Some(detached) = next.take() {
            match detached {
                Detached::Promoted { key, promoted } => match self.source.get(&promoted) {
                    Some(row) => {
                        debug!(key = ?key, promoted = ?promoted, "shadowed row promoted");
                        self.subscribers.on_data(&key, &row);
                    }
                    None => {
                        warn!(key = ?key, promoted = ?promoted, "shadowed row is gone from the source");
                        next = self.maps.borrow_mut().detach(&promoted);
                    }
                },
                Detached::Removed { key } => {
                    trace!(key = ?key, "derived row removed");
                    self.subscribers.on_delete(&key, data);
                }
                Detached::Shadowed => {}
            }
        }
    }

    fn upsert(&self, source: &S, data: &Record) {
        let row = self.current_row(source, data);
        let key = match self.key_extractor.key_of(&row) {
            Ok(key) => key,
            Err(err) => {
                warn!(source = ?source, %err, "source row has no usable derived key");
                self.delete(source, data);
                return;
            }
        };

        let moved = {
            let mut maps = self.maps.borrow_mut();
            let moved_away = maps
                .mapping_from
                .get(source)
                .map_or(false, |previous| *previous != key);
            let moved = if moved_away { maps.detach(source) } else { None };
            maps.attach(source, &key);
            moved
        };
        if let Some(detached) = moved {
            debug!(source = ?source, to = ?key, "source row moved to another key");
            self.publish_detached(detached, data);
        }
        self.subscribers.on_data(&key, data);
    }

    fn patch(&self, source: &S, update: &PartialUpdate) {
        let row = self.current_row(source, update.data());
        let mapped = self.maps.borrow().mapping_from.get(source).cloned();
        match (self.key_extractor.key_of(&row), mapped) {
            (Ok(key), Some(mapped)) if key == mapped => {
                if self.maps.borrow().is_active(source) {
                    self.subscribers.on_partial(&key, update);
                }
            }
            _ => self.upsert(source, &row),
        }
    }

    fn delete(&self, source: &S, data: &Record) {
        let detached = self.maps.borrow_mut().detach(source);
        if let Some(detached) = detached {
            self.publish_detached(detached, data);
        }
    }
}

struct SourceListener<K: TableKey, S: TableKey> {
    state: Weak<RekeyState<K, S>>,
}

impl<K: TableKey, S: TableKey> KeyedSubscriber<S> for SourceListener<K, S> {
    fn on_data(&self, key: &S, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            state.upsert(key, data);
        }
    }

    fn on_partial(&self, key: &S, update: &PartialUpdate) {
        if let Some(state) = self.state.upgrade() {
            state.patch(key, update);
        }
    }

    fn on_delete(&self, key: &S, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            state.delete(key, data);
        }
    }
}

/// A source table presented under keys computed from its rows.
pub struct ReKeyedTable<K: TableKey, S: TableKey> {
    state: Rc<RekeyState<K, S>>,
    subscription: RefCell<Subscription>,
}

impl<K: TableKey, S: TableKey> ReKeyedTable<K, S> {
    /// Creates the table and maps every row `source` already holds.
    pub fn new<T>(source: Rc<T>, key_extractor: impl KeyExtractor<K> + 'static) -> Self
    where
        T: KeyedTable<S> + 'static,
    {
        let state = Rc::new(RekeyState {
            source: source.clone(),
            key_extractor: Box::new(key_extractor),
            maps: RefCell::new(RekeyMaps::new()),
            subscribers: KeyedSubscribers::new(),
        });

        for (key, row) in source.entry_set() {
            state.upsert(&key, &row);
        }
        let subscription = source.subscribe(Rc::new(SourceListener {
            state: Rc::downgrade(&state),
        }));
        debug!(
            keys = state.maps.borrow().mapping_to.len(),
            shadowed = state.maps.borrow().shadow.len(),
            "re-keyed table created"
        );

        Self {
            state,
            subscription: RefCell::new(subscription),
        }
    }

    /// Returns the source key currently backing `key`.
    pub fn source_key_of(&self, key: &K) -> Option<S> {
        self.state.maps.borrow().mapping_to.get(key).cloned()
    }

    /// Returns the shadowed source keys for `key`, oldest first.
    pub fn shadowed(&self, key: &K) -> Vec<S> {
        self.state
            .maps
            .borrow()
            .shadow
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

impl<K: TableKey, S: TableKey> KeyedPublisher<K> for ReKeyedTable<K, S> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K>>) -> Subscription {
        self.state.subscribers.add_subscriber(subscriber)
    }
}

impl<K: TableKey, S: TableKey> KeyedTable<K> for ReKeyedTable<K, S> {
    fn schema(&self) -> &Schema {
        self.state.source.schema()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.state.maps.borrow().mapping_to.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<Record> {
        let source = self.source_key_of(key)?;
        self.state.source.get(&source)
    }

    fn key_set(&self) -> BTreeSet<K> {
        self.state.maps.borrow().mapping_to.keys().cloned().collect()
    }
}

impl<K: TableKey, S: TableKey> Closeable for ReKeyedTable<K, S> {
    fn close(&self) {
        self.subscription.borrow_mut().close();
        debug!("re-keyed table closed");
    }
}
