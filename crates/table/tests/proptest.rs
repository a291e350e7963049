//! Property-based tests for dido-table using proptest.
//!
//! Random mutation sequences are replayed against basic tables and the
//! derived tables are compared with a recomputation from their sources.
//! Join events are also checked against the join's own rows at the moment
//! they are published.

use dido_core::{Concatenator, DataType, KeyExtractors, PartialUpdate, Record, RowBuffer, Schema};
use dido_table::{
    BasicTable, DataJoin, JoinedTable, KeyedPublisher, KeyedSubscriber, KeyedTable, ReKeyedTable,
    Receiver,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone)]
enum Op {
    UpsertLeft(i32, i32, i32),
    /// Upserts a record carrying only the key and the first value field.
    ProjectLeft(i32, i32),
    /// Patches the first value field, or the second if the flag is set.
    PatchLeft(i32, i32, bool),
    DeleteLeft(i32),
    UpsertRight(i32, i32, i32),
    ProjectRight(i32, i32),
    DeleteRight(i32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..8, 0..4, 0..4).prop_map(|(k, a, c)| Op::UpsertLeft(k, a, c)),
        (0..8, 0..4).prop_map(|(k, a)| Op::ProjectLeft(k, a)),
        (0..8, 0..4, any::<bool>()).prop_map(|(k, v, second)| Op::PatchLeft(k, v, second)),
        (0..8).prop_map(Op::DeleteLeft),
        (0..8, 0..4, 0..4).prop_map(|(k, b, d)| Op::UpsertRight(k, b, d)),
        (0..8, 0..4).prop_map(|(k, b)| Op::ProjectRight(k, b)),
        (0..8).prop_map(Op::DeleteRight),
    ]
}

fn schema(first: &str, second: &str) -> Schema {
    Schema::try_from(
        &[
            ("Id", DataType::Int32),
            (first, DataType::Int32),
            (second, DataType::Int32),
        ][..],
    )
    .unwrap()
}

fn row(schema: &Schema, key: i32, first: i32, second: i32) -> Record {
    Record::of(schema, vec![key.into(), first.into(), second.into()]).unwrap()
}

fn key(schema: &Schema, key: i32) -> Record {
    Record::builder(schema).set_at(1, key).unwrap().build()
}

struct Tables {
    left_schema: Schema,
    right_schema: Schema,
    left: Rc<BasicTable<i32>>,
    right: Rc<BasicTable<i32>>,
}

impl Tables {
    fn new() -> Self {
        let left_schema = schema("A", "C");
        let right_schema = schema("B", "D");
        Self {
            left: Rc::new(BasicTable::with_schema(left_schema.clone()).create().unwrap()),
            right: Rc::new(BasicTable::with_schema(right_schema.clone()).create().unwrap()),
            left_schema,
            right_schema,
        }
    }

    fn apply(&self, op: &Op) {
        match *op {
            Op::UpsertLeft(k, a, c) => self.left.upsert(&row(&self.left_schema, k, a, c)).unwrap(),
            Op::ProjectLeft(k, a) => {
                let projected = row(&self.left_schema, k, a, 0).project(&[1, 2]).unwrap();
                self.left.upsert(&projected).unwrap();
            }
            Op::PatchLeft(k, v, second) => {
                if self.left.contains_key(&k) {
                    let index = if second { 3 } else { 2 };
                    let update = PartialUpdate::from(row(&self.left_schema, k, v, v))
                        .with_indices(&[index])
                        .unwrap();
                    self.left.apply_patch(&update).unwrap();
                }
            }
            Op::DeleteLeft(k) => {
                if self.left.contains_key(&k) {
                    self.left.delete(&key(&self.left_schema, k)).unwrap();
                }
            }
            Op::UpsertRight(k, b, d) => {
                self.right.upsert(&row(&self.right_schema, k, b, d)).unwrap()
            }
            Op::ProjectRight(k, b) => {
                let projected = row(&self.right_schema, k, b, 0).project(&[1, 2]).unwrap();
                self.right.upsert(&projected).unwrap();
            }
            Op::DeleteRight(k) => {
                if self.right.contains_key(&k) {
                    self.right.delete(&key(&self.right_schema, k)).unwrap();
                }
            }
        }
    }

    fn join(&self, inner: bool) -> Rc<JoinedTable<i32>> {
        let join = DataJoin::from(self.left.clone()).primary_keys();
        let joined = if inner {
            join.inner_join(self.right.clone())
        } else {
            join.left_join(self.right.clone())
        };
        Rc::new(joined.unwrap())
    }
}

/// Rebuilds a join's rows from its events, checking each event against the
/// join's current row as it arrives.
struct Mirror {
    table: Weak<JoinedTable<i32>>,
    rows: RefCell<BTreeMap<i32, Record>>,
    mismatches: RefCell<Vec<String>>,
}

impl Mirror {
    fn attach(table: &Rc<JoinedTable<i32>>) -> (Rc<Self>, dido_table::Subscription) {
        let mirror = Rc::new(Self {
            table: Rc::downgrade(table),
            rows: RefCell::new(table.entry_set().into_iter().collect()),
            mismatches: RefCell::new(Vec::new()),
        });
        let subscription = table.subscribe(mirror.clone());
        (mirror, subscription)
    }

    fn current(&self, key: &i32) -> Option<Record> {
        self.table.upgrade().and_then(|table| table.get(key))
    }

    fn mismatch(&self, message: String) {
        self.mismatches.borrow_mut().push(message);
    }
}

impl KeyedSubscriber<i32> for Mirror {
    fn on_data(&self, key: &i32, data: &Record) {
        let current = self.current(key);
        if current.as_ref() != Some(data) {
            self.mismatch(format!("data {} {} but the row is {:?}", key, data, current));
        }
        self.rows.borrow_mut().insert(*key, data.clone());
    }

    fn on_partial(&self, key: &i32, update: &PartialUpdate) {
        let patched = {
            let rows = self.rows.borrow();
            rows.get(key).map(|row| {
                let mut buffer = RowBuffer::copy_of(row.schema(), row).unwrap();
                buffer.apply(update).unwrap();
                buffer.to_record()
            })
        };
        let Some(patched) = patched else {
            self.mismatch(format!("partial {} {} for an unpublished row", key, update));
            return;
        };
        let current = self.current(key);
        if current.as_ref() != Some(&patched) {
            self.mismatch(format!("partial {} left {} but the row is {:?}", key, patched, current));
        }
        self.rows.borrow_mut().insert(*key, patched);
    }

    fn on_delete(&self, key: &i32, data: &Record) {
        if let Some(current) = self.current(key) {
            self.mismatch(format!("delete {} {} but the row is {}", key, data, current));
        }
        if self.rows.borrow_mut().remove(key).is_none() {
            self.mismatch(format!("delete {} for an unpublished row", key));
        }
    }
}

proptest! {
    /// An inner join holds exactly the keys both sides hold, and its
    /// events rebuild the same rows.
    #[test]
    fn inner_join_matches_recomputation(ops in prop::collection::vec(op(), 0..60)) {
        let tables = Tables::new();
        let joined = tables.join(true);
        let (mirror, _subscription) = Mirror::attach(&joined);

        for op in &ops {
            tables.apply(op);
        }

        let concatenator =
            Concatenator::from_schemas(&tables.left_schema, &tables.right_schema).unwrap();
        let expected: BTreeMap<i32, Record> = tables
            .left
            .entry_set()
            .into_iter()
            .filter_map(|(k, left)| {
                tables.right.get(&k).map(|right| (k, concatenator.concat(&left, &right)))
            })
            .collect();

        prop_assert_eq!(joined.key_set(), expected.keys().copied().collect::<BTreeSet<_>>());
        for (k, record) in &expected {
            prop_assert!(joined.contains_key(k));
            let got = joined.get(k);
            prop_assert_eq!(got.as_ref(), Some(record));
        }
        prop_assert_eq!(&*mirror.mismatches.borrow(), &Vec::<String>::new());
        prop_assert_eq!(&*mirror.rows.borrow(), &expected);
    }

    /// A left join holds every left key and reads unmatched rows with the
    /// right fields unset. Its events, partials included, track its rows.
    #[test]
    fn left_join_covers_left_keys(ops in prop::collection::vec(op(), 0..60)) {
        let tables = Tables::new();
        let joined = tables.join(false);
        let (mirror, _subscription) = Mirror::attach(&joined);

        for op in &ops {
            tables.apply(op);
        }

        prop_assert_eq!(joined.key_set(), tables.left.key_set());
        for k in 0..8 {
            prop_assert_eq!(joined.contains_key(&k), tables.left.contains_key(&k));
            if let Some(record) = joined.get(&k) {
                let left = tables.left.get(&k).unwrap();
                prop_assert_eq!(record.has_at(joined.offset() + 1), tables.right.contains_key(&k));
                prop_assert_eq!(record.value_at(2), left.value_at(2));
                prop_assert_eq!(record.value_at(3), left.value_at(3));
            }
        }
        prop_assert_eq!(&*mirror.mismatches.borrow(), &Vec::<String>::new());
        prop_assert_eq!(&*mirror.rows.borrow(), &joined.entry_set().into_iter().collect::<BTreeMap<_, _>>());
    }

    /// Every derived key is backed by one live source row computing it,
    /// and every other such row is shadowed.
    #[test]
    fn rekeyed_table_tracks_every_contributor(ops in prop::collection::vec(op(), 0..60)) {
        let tables = Tables::new();
        let by_value = ReKeyedTable::new(tables.left.clone(), KeyExtractors::at::<i32>(2));

        for op in &ops {
            tables.apply(op);
        }

        let mut contributors: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();
        for (k, record) in tables.left.entry_set() {
            let value = record.value_at(2).unwrap().as_i32().unwrap();
            contributors.entry(value).or_default().insert(k);
        }

        prop_assert_eq!(by_value.key_set(), contributors.keys().copied().collect::<BTreeSet<_>>());
        for (value, sources) in &contributors {
            let active = by_value.source_key_of(value).unwrap();
            let mut seen: BTreeSet<i32> = by_value.shadowed(value).into_iter().collect();
            prop_assert!(!seen.contains(&active));
            seen.insert(active);
            prop_assert_eq!(&seen, sources);
            prop_assert_eq!(by_value.get(value), tables.left.get(&active));
        }
    }
}
