//! Subscription handles and subscriber fan-out.
//!
//! [`KeyedSubscribers`] stores its listeners as none, one, or many. The
//! single-listener case dispatches without allocating; adding a second
//! listener moves to a list, and removing back down to one moves back.

use crate::subscriber::{KeyedPublisher, KeyedSubscriber};
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use dido_core::{PartialUpdate, Record};
use tracing::trace;

/// Unique identifier for a listener within one [`KeyedSubscribers`].
pub type SubscriptionId = u64;

/// A handle that removes a listener when closed.
///
/// Dropping the handle leaves the listener subscribed. Closing a second
/// time does nothing.
pub struct Subscription {
    closer: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a handle that runs `closer` the first time it is closed.
    pub fn new<F>(closer: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            closer: Some(Box::new(closer)),
        }
    }

    /// A handle that is already closed.
    pub fn closed() -> Self {
        Self { closer: None }
    }

    /// Returns a handle that closes both `self` and `other`, in that order.
    pub fn and(mut self, mut other: Subscription) -> Subscription {
        Subscription::new(move || {
            self.close();
            other.close();
        })
    }

    /// Removes the listener. Idempotent.
    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }

    /// Returns true once the handle has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closer.is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

enum Listeners<K> {
    Empty,
    Single(SubscriptionId, Rc<dyn KeyedSubscriber<K>>),
    Many(Vec<(SubscriptionId, Rc<dyn KeyedSubscriber<K>>)>),
}

struct State<K> {
    listeners: Listeners<K>,
    next_id: SubscriptionId,
}

impl<K> State<K> {
    fn add(&mut self, listener: Rc<dyn KeyedSubscriber<K>>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;

        self.listeners = match core::mem::replace(&mut self.listeners, Listeners::Empty) {
            Listeners::Empty => Listeners::Single(id, listener),
            Listeners::Single(first_id, first) => {
                let mut list = Vec::with_capacity(2);
                list.push((first_id, first));
                list.push((id, listener));
                Listeners::Many(list)
            }
            Listeners::Many(mut list) => {
                list.push((id, listener));
                Listeners::Many(list)
            }
        };
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let (listeners, removed) = match core::mem::replace(&mut self.listeners, Listeners::Empty)
        {
            Listeners::Single(single_id, _) if single_id == id => (Listeners::Empty, true),
            Listeners::Many(mut list) => {
                let before = list.len();
                list.retain(|(listener_id, _)| *listener_id != id);
                let removed = list.len() != before;
                let listeners = if list.len() == 1 {
                    let (remaining_id, remaining) = list.remove(0);
                    Listeners::Single(remaining_id, remaining)
                } else {
                    Listeners::Many(list)
                };
                (listeners, removed)
            }
            other => (other, false),
        };
        self.listeners = listeners;
        removed
    }

    fn len(&self) -> usize {
        match &self.listeners {
            Listeners::Empty => 0,
            Listeners::Single(..) => 1,
            Listeners::Many(list) => list.len(),
        }
    }
}

/// Listeners captured before a dispatch begins.
enum Snapshot<K> {
    None,
    One(Rc<dyn KeyedSubscriber<K>>),
    Many(Vec<Rc<dyn KeyedSubscriber<K>>>),
}

/// Fans keyed change events out to every subscribed listener.
///
/// Listeners are called in subscription order. Each dispatch works on a
/// snapshot taken before the first callback, so a listener added or closed
/// from inside a callback takes effect with the next event.
pub struct KeyedSubscribers<K> {
    state: Rc<RefCell<State<K>>>,
}

impl<K: 'static> KeyedSubscribers<K> {
    /// Creates an empty fan-out.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                listeners: Listeners::Empty,
                next_id: 1,
            })),
        }
    }

    /// Adds a listener, returning the handle that removes it.
    pub fn add_subscriber(&self, listener: Rc<dyn KeyedSubscriber<K>>) -> Subscription {
        let id = self.state.borrow_mut().add(listener);
        trace!(id, listeners = self.len(), "subscriber added");

        let state: Weak<RefCell<State<K>>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = state.borrow_mut();
                if state.remove(id) {
                    trace!(id, listeners = state.len(), "subscriber removed");
                }
            }
        })
    }

    /// Returns the number of listeners.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    /// Returns true if there are no listeners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Snapshot<K> {
        match &self.state.borrow().listeners {
            Listeners::Empty => Snapshot::None,
            Listeners::Single(_, listener) => Snapshot::One(Rc::clone(listener)),
            Listeners::Many(list) => {
                Snapshot::Many(list.iter().map(|(_, listener)| Rc::clone(listener)).collect())
            }
        }
    }

    fn dispatch(&self, event: impl Fn(&dyn KeyedSubscriber<K>)) {
        match self.snapshot() {
            Snapshot::None => {}
            Snapshot::One(listener) => event(&*listener),
            Snapshot::Many(list) => {
                for listener in &list {
                    event(&**listener);
                }
            }
        }
    }
}

impl<K: 'static> Default for KeyedSubscribers<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: 'static> KeyedSubscriber<K> for KeyedSubscribers<K> {
    fn on_data(&self, key: &K, data: &Record) {
        self.dispatch(|listener| listener.on_data(key, data));
    }

    fn on_partial(&self, key: &K, update: &PartialUpdate) {
        self.dispatch(|listener| listener.on_partial(key, update));
    }

    fn on_delete(&self, key: &K, data: &Record) {
        self.dispatch(|listener| listener.on_delete(key, data));
    }
}

impl<K: 'static> KeyedPublisher<K> for KeyedSubscribers<K> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K>>) -> Subscription {
        self.add_subscriber(subscriber)
    }
}

impl<K> fmt::Debug for KeyedSubscribers<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSubscribers")
            .field("listeners", &self.state.borrow().len())
            .finish()
    }
}
