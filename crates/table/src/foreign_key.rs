//! Many-to-one lookup through a foreign key.
//!
//! A [`ForeignKeyedTable`] presents a reference table under the keys of a
//! child table: `get(k1)` is the reference row whose key the child row `k1`
//! names. It keeps a forward map `k1 -> k2` and a reverse map
//! `k2 -> {k1}` so that a reference change fans out to every child that
//! points at it.

use crate::table::{Closeable, KeyedTable, TableKey};
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use dido_core::{Error, KeyExtractor, PartialUpdate, Record, Result, Schema};
use dido_reactive::{KeyedPublisher, KeyedSubscriber, KeyedSubscribers, Subscription};
use tracing::{debug, trace, warn};

/// The forward and reverse maps between child and reference keys.
///
/// Every `k1` with a forward entry is in `reverse[forward[k1]]`, and no
/// reverse entry is ever empty.
#[derive(Debug)]
struct ForeignKeyMaps<K1, K2> {
    forward: BTreeMap<K1, K2>,
    reverse: BTreeMap<K2, BTreeSet<K1>>,
}

impl<K1: TableKey, K2: TableKey> ForeignKeyMaps<K1, K2> {
    fn new() -> Self {
        Self {
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
        }
    }

    /// Points `child` at `reference`. Returns the reference it was moved
    /// away from, if any.
    ///
    /// The new link is made even if the old one was broken; the error only
    /// reports it.
    fn link(&mut self, child: &K1, reference: K2) -> Result<Option<K2>> {
        if self.forward.get(child) == Some(&reference) {
            return Ok(None);
        }
        let previous = self.unlink(child);
        self.reverse
            .entry(reference.clone())
            .or_default()
            .insert(child.clone());
        self.forward.insert(child.clone(), reference);
        previous
    }

    /// Removes `child`'s link. Returns the reference it pointed at.
    ///
    /// Fails if `child` is missing from that reference's children; the
    /// forward entry is dropped either way.
    fn unlink(&mut self, child: &K1) -> Result<Option<K2>> {
        let reference = match self.forward.remove(child) {
            Some(reference) => reference,
            None => return Ok(None),
        };
        let emptied = match self.reverse.get_mut(&reference) {
            Some(children) if children.contains(child) => {
                children.remove(child);
                children.is_empty()
            }
            _ => {
                return Err(Error::invalid_key(
                    0,
                    format!("{:?} links to {:?} but is not one of its children", child, reference),
                ))
            }
        };
        if emptied {
            self.reverse.remove(&reference);
        }
        Ok(Some(reference))
    }

    fn children_of(&self, reference: &K2) -> Vec<K1> {
        self.reverse
            .get(reference)
            .map(|children| children.iter().cloned().collect())
            .unwrap_or_default()
    }
}

struct ForeignKeyState<K1: TableKey, K2: TableKey> {
    child: Rc<dyn KeyedTable<K1>>,
    reference: Rc<dyn KeyedTable<K2>>,
    foreign_key: Box<dyn KeyExtractor<K2>>,
    maps: RefCell<ForeignKeyMaps<K1, K2>>,
    subscribers: KeyedSubscribers<K1>,
    child_relay: KeyedSubscribers<K1>,
}

impl<K1: TableKey, K2: TableKey> ForeignKeyState<K1, K2> {
    /// Re-derives `child`'s foreign key from its current row, or from
    /// `data` if the child table no longer has it. Returns whether the
    /// link changed.
    fn relink(&self, child: &K1, data: &Record) -> bool {
        let current = self.child.get(child);
        let row = current.as_ref().unwrap_or(data);
        match self.foreign_key.key_of(row) {
            Ok(reference) => {
                let previous = self.reference_of(child);
                if previous.as_ref() == Some(&reference) {
                    return false;
                }
                let linked = self.maps.borrow_mut().link(child, reference.clone());
                if let Err(err) = linked {
                    warn!(child = ?child, %err, "foreign key maps disagree");
                }
                match previous {
                    Some(previous) => {
                        debug!(child = ?child, from = ?previous, to = ?reference, "foreign key moved")
                    }
                    None => trace!(child = ?child, reference = ?reference, "foreign key linked"),
                }
                true
            }
            Err(err) => {
                warn!(child = ?child, %err, "child row has no usable foreign key");
                self.unlink(child).is_some()
            }
        }
    }

    /// Drops `child`'s link, returning the reference it pointed at.
    fn unlink(&self, child: &K1) -> Option<K2> {
        let unlinked = self.maps.borrow_mut().unlink(child);
        unlinked.unwrap_or_else(|err| {
            warn!(child = ?child, %err, "foreign key maps disagree");
            None
        })
    }

    fn reference_of(&self, child: &K1) -> Option<K2> {
        self.maps.borrow().forward.get(child).cloned()
    }
}

struct ChildListener<K1: TableKey, K2: TableKey> {
    state: Weak<ForeignKeyState<K1, K2>>,
}

impl<K1: TableKey, K2: TableKey> KeyedSubscriber<K1> for ChildListener<K1, K2> {
    fn on_data(&self, key: &K1, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            state.relink(key, data);
            state.child_relay.on_data(key, data);
        }
    }

    /// A patch that moves the foreign key is relayed as the child's whole
    /// current row.
    fn on_partial(&self, key: &K1, update: &PartialUpdate) {
        if let Some(state) = self.state.upgrade() {
            let moved = state.relink(key, update.data());
            match state.child.get(key) {
                Some(row) if moved => state.child_relay.on_data(key, &row),
                _ => state.child_relay.on_partial(key, update),
            }
        }
    }

    fn on_delete(&self, key: &K1, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            state.child_relay.on_delete(key, data);
            if let Some(reference) = state.unlink(key) {
                trace!(child = ?key, reference = ?reference, "foreign key unlinked");
            }
        }
    }
}

struct ReferenceListener<K1: TableKey, K2: TableKey> {
    state: Weak<ForeignKeyState<K1, K2>>,
}

impl<K1: TableKey, K2: TableKey> ReferenceListener<K1, K2> {
    fn fan_out(&self, reference: &K2, event: impl Fn(&KeyedSubscribers<K1>, &K1)) {
        if let Some(state) = self.state.upgrade() {
            let children = state.maps.borrow().children_of(reference);
            for child in &children {
                event(&state.subscribers, child);
            }
        }
    }
}

impl<K1: TableKey, K2: TableKey> KeyedSubscriber<K2> for ReferenceListener<K1, K2> {
    fn on_data(&self, key: &K2, data: &Record) {
        self.fan_out(key, |subscribers, child| subscribers.on_data(child, data));
    }

    fn on_partial(&self, key: &K2, update: &PartialUpdate) {
        self.fan_out(key, |subscribers, child| subscribers.on_partial(child, update));
    }

    fn on_delete(&self, key: &K2, data: &Record) {
        self.fan_out(key, |subscribers, child| subscribers.on_delete(child, data));
    }
}

/// A reference table re-keyed by the children that point at its rows.
///
/// Child events are re-published through [`ForeignKeyedTable::subscribe_child`]
/// after an upsert has been linked and before a delete is unlinked, so a
/// listener there always sees maps that agree with the event.
pub struct ForeignKeyedTable<K1: TableKey, K2: TableKey> {
    state: Rc<ForeignKeyState<K1, K2>>,
    subscriptions: RefCell<Subscription>,
}

impl<K1: TableKey, K2: TableKey> ForeignKeyedTable<K1, K2> {
    /// Creates the table and links every row `child` already holds.
    pub fn new<C, R>(
        child: Rc<C>,
        reference: Rc<R>,
        foreign_key: impl KeyExtractor<K2> + 'static,
    ) -> Self
    where
        C: KeyedTable<K1> + 'static,
        R: KeyedTable<K2> + 'static,
    {
        let state = Rc::new(ForeignKeyState {
            child: child.clone(),
            reference: reference.clone(),
            foreign_key: Box::new(foreign_key),
            maps: RefCell::new(ForeignKeyMaps::new()),
            subscribers: KeyedSubscribers::new(),
            child_relay: KeyedSubscribers::new(),
        });

        let child_listener = Rc::new(ChildListener {
            state: Rc::downgrade(&state),
        });
        let reference_listener = Rc::new(ReferenceListener {
            state: Rc::downgrade(&state),
        });

        for (key, row) in child.entry_set() {
            child_listener.on_data(&key, &row);
        }
        let subscriptions = child
            .subscribe(child_listener)
            .and(reference.subscribe(reference_listener));
        debug!(
            children = state.maps.borrow().forward.len(),
            references = state.maps.borrow().reverse.len(),
            "foreign keyed table created"
        );

        Self {
            state,
            subscriptions: RefCell::new(subscriptions),
        }
    }

    /// Subscribes to the child table's events, relayed in map order.
    pub fn subscribe_child(&self, subscriber: Rc<dyn KeyedSubscriber<K1>>) -> Subscription {
        self.state.child_relay.add_subscriber(subscriber)
    }

    /// Returns the reference key `child` currently points at.
    pub fn foreign_key_of(&self, child: &K1) -> Option<K2> {
        self.state.reference_of(child)
    }

    /// Returns the children currently pointing at `reference`.
    pub fn children_of(&self, reference: &K2) -> BTreeSet<K1> {
        self.state
            .maps
            .borrow()
            .reverse
            .get(reference)
            .cloned()
            .unwrap_or_default()
    }
}

impl<K1: TableKey, K2: TableKey> KeyedPublisher<K1> for ForeignKeyedTable<K1, K2> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K1>>) -> Subscription {
        self.state.subscribers.add_subscriber(subscriber)
    }
}

impl<K1: TableKey, K2: TableKey> KeyedTable<K1> for ForeignKeyedTable<K1, K2> {
    fn schema(&self) -> &Schema {
        self.state.reference.schema()
    }

    fn contains_key(&self, key: &K1) -> bool {
        self.state
            .reference_of(key)
            .map_or(false, |reference| self.state.reference.contains_key(&reference))
    }

    fn get(&self, key: &K1) -> Option<Record> {
        self.state
            .reference_of(key)
            .and_then(|reference| self.state.reference.get(&reference))
    }

    fn key_set(&self) -> BTreeSet<K1> {
        let maps = self.state.maps.borrow();
        maps.forward
            .iter()
            .filter(|(_, reference)| self.state.reference.contains_key(reference))
            .map(|(child, _)| child.clone())
            .collect()
    }
}

impl<K1: TableKey, K2: TableKey> Closeable for ForeignKeyedTable<K1, K2> {
    fn close(&self) {
        self.subscriptions.borrow_mut().close();
        debug!("foreign keyed table closed");
    }
}
