//! Live inner and left joins of keyed tables.
//!
//! A join presents rows of the concatenated schema: the left schema's
//! fields followed by the right schema's, with right indices shifted by the
//! left schema's last index.
//!
//! A data event always carries the whole current joined row, however
//! little of it the triggering upsert set. An inner join publishes a delete
//! when a published row loses its match on either side.
//!
//! Partial updates are forwarded unchanged, in the index space of the table
//! they came from. A listener that needs right-side patches in joined index
//! space can shift them with `PartialUpdate::transposed(join.offset())`.

use crate::foreign_key::ForeignKeyedTable;
use crate::table::{Closeable, KeyedTable, TableKey};
use alloc::collections::BTreeSet;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::marker::PhantomData;
use dido_core::{Concatenator, IndexSequence, KeyExtractor, PartialUpdate, Record, Result, Schema};
use dido_reactive::{KeyedPublisher, KeyedSubscriber, KeyedSubscribers, Subscription};
use tracing::{debug, trace};

/// How unmatched rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only keys present on both sides.
    Inner,
    /// Every left key; a missing right row reads as all fields unset.
    Left,
}

struct JoinState<K: TableKey> {
    join_type: JoinType,
    left: Rc<dyn KeyedTable<K>>,
    right: Rc<dyn KeyedTable<K>>,
    concatenator: Concatenator,
    /// Keys an inner join has published and not yet deleted.
    matched: RefCell<BTreeSet<K>>,
    subscribers: KeyedSubscribers<K>,
}

impl<K: TableKey> JoinState<K> {
    fn contains_key(&self, key: &K) -> bool {
        match self.join_type {
            JoinType::Inner => self.left.contains_key(key) && self.right.contains_key(key),
            JoinType::Left => self.left.contains_key(key),
        }
    }

    fn get(&self, key: &K) -> Option<Record> {
        let left = self.left.get(key)?;
        let right = match self.join_type {
            JoinType::Inner => self.right.get(key)?,
            JoinType::Left => self.right_or_empty(key),
        };
        Some(self.concatenator.concat(&left, &right))
    }

    fn right_or_empty(&self, key: &K) -> Record {
        self.right
            .get(key)
            .unwrap_or_else(|| self.concatenator.empty_right())
    }

    fn left_or_empty(&self, key: &K) -> Record {
        self.left
            .get(key)
            .unwrap_or_else(|| Record::empty(self.concatenator.left_schema()))
    }

    /// Forgets a published inner-join key. Returns whether it was published.
    fn unmatch(&self, key: &K) -> bool {
        self.matched.borrow_mut().remove(key)
    }

    /// Publishes the current joined row for `key`. If there is none and an
    /// inner join had published the key, publishes a delete of `lost`.
    fn publish_row(&self, key: &K, lost: impl FnOnce() -> Record) {
        match self.get(key) {
            Some(row) => {
                if self.join_type == JoinType::Inner {
                    self.matched.borrow_mut().insert(key.clone());
                }
                self.subscribers.on_data(key, &row);
            }
            None => {
                if self.unmatch(key) {
                    debug!(key = ?key, "joined row lost its match");
                    self.subscribers.on_delete(key, &lost());
                }
            }
        }
    }

    fn left_data(&self, key: &K) {
        trace!(key = ?key, "left row changed");
        self.publish_row(key, || {
            self.concatenator
                .concat(&self.left_or_empty(key), &self.concatenator.empty_right())
        });
    }

    fn left_partial(&self, key: &K, update: &PartialUpdate) {
        match self.join_type {
            JoinType::Left => {
                if self.left.contains_key(key) {
                    self.subscribers.on_partial(key, update);
                }
            }
            JoinType::Inner => {
                let published = self.matched.borrow().contains(key);
                if published && self.right.contains_key(key) {
                    self.subscribers.on_partial(key, update);
                } else {
                    self.publish_row(key, || {
                        self.concatenator
                            .concat(&self.left_or_empty(key), &self.concatenator.empty_right())
                    });
                }
            }
        }
    }

    fn left_delete(&self, key: &K, data: &Record) {
        if self.join_type == JoinType::Inner && !self.unmatch(key) {
            return;
        }
        trace!(key = ?key, "left row deleted");
        self.subscribers
            .on_delete(key, &self.concatenator.concat(data, &self.right_or_empty(key)));
    }

    fn right_data(&self, key: &K, data: &Record) {
        trace!(key = ?key, "right row changed");
        self.publish_row(key, || self.concatenator.concat(&self.left_or_empty(key), data));
    }

    fn right_partial(&self, key: &K, update: &PartialUpdate) {
        let joined = match self.join_type {
            JoinType::Inner => self.matched.borrow().contains(key),
            JoinType::Left => self.left.contains_key(key),
        };
        if joined {
            self.subscribers.on_partial(key, update);
        }
    }

    fn right_delete(&self, key: &K, data: &Record) {
        match self.join_type {
            JoinType::Inner => {
                if self.unmatch(key) {
                    trace!(key = ?key, "right row deleted");
                    self.subscribers
                        .on_delete(key, &self.concatenator.concat(&self.left_or_empty(key), data));
                }
            }
            JoinType::Left => {
                let left = match self.left.get(key) {
                    Some(left) => left,
                    None => return,
                };
                debug!(key = ?key, "left row lost its match");
                let unmatched = self
                    .concatenator
                    .concat(&left, &self.concatenator.empty_right());
                let right_fields = self
                    .concatenator
                    .right_schema()
                    .transpose(self.concatenator.offset());
                let update = PartialUpdate::from(unmatched).with_sequence(&right_fields);
                self.subscribers.on_partial(key, &update);
            }
        }
    }
}

/// Which side of the join a listener is attached to.
#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct SideListener<K: TableKey> {
    side: Side,
    state: Weak<JoinState<K>>,
}

impl<K: TableKey> KeyedSubscriber<K> for SideListener<K> {
    fn on_data(&self, key: &K, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            match self.side {
                Side::Left => state.left_data(key),
                Side::Right => state.right_data(key, data),
            }
        }
    }

    fn on_partial(&self, key: &K, update: &PartialUpdate) {
        if let Some(state) = self.state.upgrade() {
            match self.side {
                Side::Left => state.left_partial(key, update),
                Side::Right => state.right_partial(key, update),
            }
        }
    }

    fn on_delete(&self, key: &K, data: &Record) {
        if let Some(state) = self.state.upgrade() {
            match self.side {
                Side::Left => state.left_delete(key, data),
                Side::Right => state.right_delete(key, data),
            }
        }
    }
}

/// A live join of two keyed tables.
pub struct JoinedTable<K: TableKey> {
    state: Rc<JoinState<K>>,
    subscriptions: RefCell<Subscription>,
    owned: Option<Rc<dyn Closeable>>,
}

impl<K: TableKey> JoinedTable<K> {
    fn new(
        join_type: JoinType,
        left: Rc<dyn KeyedTable<K>>,
        left_events: &dyn KeyedPublisher<K>,
        right: Rc<dyn KeyedTable<K>>,
        owned: Option<Rc<dyn Closeable>>,
    ) -> Result<Self> {
        let concatenator = Concatenator::from_schemas(left.schema(), right.schema())?;
        let matched = match join_type {
            JoinType::Inner => {
                let right_keys = right.key_set();
                left.key_set().intersection(&right_keys).cloned().collect()
            }
            JoinType::Left => BTreeSet::new(),
        };
        let state = Rc::new(JoinState {
            join_type,
            left,
            right,
            concatenator,
            matched: RefCell::new(matched),
            subscribers: KeyedSubscribers::new(),
        });

        let left_subscription = left_events.subscribe(Rc::new(SideListener {
            side: Side::Left,
            state: Rc::downgrade(&state),
        }));
        let right_subscription = state.right.subscribe(Rc::new(SideListener {
            side: Side::Right,
            state: Rc::downgrade(&state),
        }));
        debug!(?join_type, schema = %state.concatenator.schema(), "join created");

        Ok(Self {
            state,
            subscriptions: RefCell::new(left_subscription.and(right_subscription)),
            owned,
        })
    }

    /// Returns whether this is an inner or a left join.
    pub fn join_type(&self) -> JoinType {
        self.state.join_type
    }

    /// The shift applied to right-hand field indices.
    pub fn offset(&self) -> usize {
        self.state.concatenator.offset()
    }
}

impl<K: TableKey> KeyedPublisher<K> for JoinedTable<K> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K>>) -> Subscription {
        self.state.subscribers.add_subscriber(subscriber)
    }
}

impl<K: TableKey> KeyedTable<K> for JoinedTable<K> {
    fn schema(&self) -> &Schema {
        self.state.concatenator.schema()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.state.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<Record> {
        self.state.get(key)
    }

    fn key_set(&self) -> BTreeSet<K> {
        let left = self.state.left.key_set();
        match self.state.join_type {
            JoinType::Inner => {
                let right = self.state.right.key_set();
                left.intersection(&right).cloned().collect()
            }
            JoinType::Left => left,
        }
    }
}

impl<K: TableKey> Closeable for JoinedTable<K> {
    fn close(&self) {
        self.subscriptions.borrow_mut().close();
        if let Some(owned) = &self.owned {
            owned.close();
        }
        debug!(join_type = ?self.state.join_type, "join closed");
    }
}

/// Entry point for building joins.
///
/// ```rust
/// use dido_core::{DataType, Record, Schema};
/// use dido_table::{BasicTable, DataJoin, KeyedTable, Receiver};
/// use std::rc::Rc;
///
/// let fruit = Schema::try_from(&[("Id", DataType::Int32), ("Fruit", DataType::String)][..]).unwrap();
/// let price = Schema::try_from(&[("Id", DataType::Int32), ("Price", DataType::Float64)][..]).unwrap();
///
/// let fruits = Rc::new(BasicTable::<i32>::with_schema(fruit.clone()).create().unwrap());
/// let prices = Rc::new(BasicTable::<i32>::with_schema(price.clone()).create().unwrap());
/// let joined = DataJoin::from(fruits.clone()).primary_keys().inner_join(prices.clone()).unwrap();
///
/// fruits.upsert(&Record::of(&fruit, vec![1.into(), "Apple".into()]).unwrap()).unwrap();
/// assert!(!joined.contains_key(&1));
///
/// prices.upsert(&Record::of(&price, vec![1.into(), 23.5.into()]).unwrap()).unwrap();
/// assert_eq!(
///     joined.get(&1).unwrap().to_string(),
///     "{[1:Id]=1, [2:Fruit]=Apple, [3:Id_]=1, [4:Price]=23.5}"
/// );
/// ```
pub struct DataJoin;

impl DataJoin {
    /// Starts a join with `left` as the driving table.
    pub fn from<K, L>(left: Rc<L>) -> JoinFrom<K, L>
    where
        K: TableKey,
        L: KeyedTable<K> + 'static,
    {
        JoinFrom {
            left,
            _key: PhantomData,
        }
    }
}

/// A join whose key strategy is chosen next.
pub struct JoinFrom<K, L> {
    left: Rc<L>,
    _key: PhantomData<fn() -> K>,
}

impl<K: TableKey, L: KeyedTable<K> + 'static> JoinFrom<K, L> {
    /// Joins rows with equal keys.
    pub fn primary_keys(self) -> PrimaryKeyJoin<K, L> {
        PrimaryKeyJoin {
            left: self.left,
            _key: PhantomData,
        }
    }

    /// Joins each left row to the right row whose key `foreign_key`
    /// extracts from it.
    pub fn foreign_key<K2, E>(self, foreign_key: E) -> ForeignKeyJoin<K, L, K2, E>
    where
        K2: TableKey,
        E: KeyExtractor<K2> + 'static,
    {
        ForeignKeyJoin {
            left: self.left,
            foreign_key,
            _keys: PhantomData,
        }
    }
}

/// A join on shared primary keys.
pub struct PrimaryKeyJoin<K, L> {
    left: Rc<L>,
    _key: PhantomData<fn() -> K>,
}

impl<K: TableKey, L: KeyedTable<K> + 'static> PrimaryKeyJoin<K, L> {
    pub fn inner_join<R>(self, right: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K> + 'static,
    {
        self.join(JoinType::Inner, right)
    }

    pub fn left_join<R>(self, right: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K> + 'static,
    {
        self.join(JoinType::Left, right)
    }

    fn join<R>(self, join_type: JoinType, right: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K> + 'static,
    {
        let events = Rc::clone(&self.left);
        JoinedTable::new(join_type, self.left, &*events, right, None)
    }
}

/// A join through a foreign key extracted from left rows.
pub struct ForeignKeyJoin<K, L, K2, E> {
    left: Rc<L>,
    foreign_key: E,
    _keys: PhantomData<fn() -> (K, K2)>,
}

impl<K, L, K2, E> ForeignKeyJoin<K, L, K2, E>
where
    K: TableKey,
    L: KeyedTable<K> + 'static,
    K2: TableKey,
    E: KeyExtractor<K2> + 'static,
{
    pub fn inner_join<R>(self, reference: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K2> + 'static,
    {
        self.join(JoinType::Inner, reference)
    }

    pub fn left_join<R>(self, reference: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K2> + 'static,
    {
        self.join(JoinType::Left, reference)
    }

    fn join<R>(self, join_type: JoinType, reference: Rc<R>) -> Result<JoinedTable<K>>
    where
        R: KeyedTable<K2> + 'static,
    {
        let lookup = Rc::new(ForeignKeyedTable::new(
            Rc::clone(&self.left),
            reference,
            self.foreign_key,
        ));
        let joined = JoinedTable::new(
            join_type,
            self.left,
            &ChildEvents(Rc::clone(&lookup)),
            lookup.clone(),
            Some(lookup.clone()),
        );
        if joined.is_err() {
            lookup.close();
        }
        joined
    }
}

/// Publishes the child events a [`ForeignKeyedTable`] relays.
struct ChildEvents<K1: TableKey, K2: TableKey>(Rc<ForeignKeyedTable<K1, K2>>);

impl<K1: TableKey, K2: TableKey> KeyedPublisher<K1> for ChildEvents<K1, K2> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K1>>) -> Subscription {
        self.0.subscribe_child(subscriber)
    }
}
