//! The basic in-memory keyed table.

use crate::table::{KeyedTable, Receiver, TableKey};
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use dido_core::{
    Error, FromValue, KeyExtractor, KeyExtractors, PartialUpdate, Record, Result, RowBuffer, Schema,
};
use dido_reactive::{KeyedPublisher, KeyedSubscriber, KeyedSubscribers, Subscription};
use tracing::{trace, warn};

type BoxedExtractor<K> = Box<dyn KeyExtractor<K>>;

enum KeySource<K> {
    Default(fn(&Schema) -> Result<BoxedExtractor<K>>),
    Given(BoxedExtractor<K>),
}

/// Settings for a [`BasicTable`].
///
/// The key extractor defaults to the first field of the schema and the
/// name defaults to `"table"`.
pub struct TableSettings<K> {
    schema: Schema,
    name: String,
    key: KeySource<K>,
}

impl<K: TableKey> TableSettings<K> {
    /// Sets the table name used in logs and errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets how a row's key is computed.
    pub fn key_extractor(mut self, extractor: impl KeyExtractor<K> + 'static) -> Self {
        self.key = KeySource::Given(Box::new(extractor));
        self
    }

    /// Creates the table.
    pub fn create(self) -> Result<BasicTable<K>> {
        let key_extractor = match self.key {
            KeySource::Given(extractor) => extractor,
            KeySource::Default(default) => default(&self.schema)?,
        };
        Ok(BasicTable {
            name: self.name,
            schema: self.schema,
            key_extractor,
            rows: RefCell::new(BTreeMap::new()),
            subscribers: KeyedSubscribers::new(),
        })
    }
}

fn first_field<K: TableKey + FromValue>(schema: &Schema) -> Result<BoxedExtractor<K>> {
    Ok(Box::new(KeyExtractors::first_field::<K>(schema)?))
}

/// A mutable, observable table of rows keyed by `K`.
///
/// Rows are kept in key order. Every successful change notifies the
/// table's subscribers before the call returns.
pub struct BasicTable<K: TableKey> {
    name: String,
    schema: Schema,
    key_extractor: BoxedExtractor<K>,
    rows: RefCell<BTreeMap<K, RowBuffer>>,
    subscribers: KeyedSubscribers<K>,
}

impl<K: TableKey + FromValue> BasicTable<K> {
    /// Starts configuring a table keyed by the first field of `schema`.
    pub fn with_schema(schema: Schema) -> TableSettings<K> {
        TableSettings {
            schema,
            name: String::from("table"),
            key: KeySource::Default(first_field::<K>),
        }
    }
}

impl<K: TableKey> BasicTable<K> {
    /// Starts configuring a table whose keys come from `extractor`.
    pub fn keyed_by(
        schema: Schema,
        extractor: impl KeyExtractor<K> + 'static,
    ) -> TableSettings<K> {
        TableSettings {
            schema,
            name: String::from("table"),
            key: KeySource::Given(Box::new(extractor)),
        }
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Computes the key of `data` with this table's extractor.
    pub fn key_of(&self, data: &Record) -> Result<K> {
        self.key_extractor.key_of(data)
    }
}

impl<K: TableKey> Receiver for BasicTable<K> {
    fn upsert(&self, data: &Record) -> Result<()> {
        let key = self.key_of(data)?;
        {
            let mut rows = self.rows.borrow_mut();
            let written = match rows.get_mut(&key) {
                Some(row) => row.copy_from(data),
                None => RowBuffer::copy_of(&self.schema, data).map(|row| {
                    rows.insert(key.clone(), row);
                }),
            };
            if let Err(err) = written {
                warn!(table = %self.name, key = ?key, %err, "upsert rejected");
                return Err(err);
            }
        }
        trace!(table = %self.name, key = ?key, "upsert");
        self.subscribers.on_data(&key, data);
        Ok(())
    }

    fn apply_patch(&self, update: &PartialUpdate) -> Result<()> {
        let key = self.key_of(update.data())?;
        {
            let mut rows = self.rows.borrow_mut();
            let row = match rows.get_mut(&key) {
                Some(row) => row,
                None => {
                    warn!(table = %self.name, key = ?key, "patch for missing row");
                    return Err(Error::no_row_for_key(self.name.as_str(), &key));
                }
            };
            if let Err(err) = row.apply(update) {
                warn!(table = %self.name, key = ?key, %err, "patch rejected");
                return Err(err);
            }
        }
        trace!(table = %self.name, key = ?key, "patch");
        self.subscribers.on_partial(&key, update);
        Ok(())
    }

    fn delete(&self, key_data: &Record) -> Result<()> {
        let key = self.key_of(key_data)?;
        let removed = self.rows.borrow_mut().remove(&key);
        if removed.is_none() {
            warn!(table = %self.name, key = ?key, "delete for missing row");
            return Err(Error::no_row_for_key(self.name.as_str(), &key));
        }
        trace!(table = %self.name, key = ?key, "delete");
        self.subscribers.on_delete(&key, key_data);
        Ok(())
    }
}

impl<K: TableKey> KeyedPublisher<K> for BasicTable<K> {
    fn subscribe(&self, subscriber: Rc<dyn KeyedSubscriber<K>>) -> Subscription {
        self.subscribers.add_subscriber(subscriber)
    }
}

impl<K: TableKey> KeyedTable<K> for BasicTable<K> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn contains_key(&self, key: &K) -> bool {
        self.rows.borrow().contains_key(key)
    }

    fn get(&self, key: &K) -> Option<Record> {
        self.rows.borrow().get(key).map(RowBuffer::to_record)
    }

    fn key_set(&self) -> BTreeSet<K> {
        self.rows.borrow().keys().cloned().collect()
    }

    fn entry_set(&self) -> Vec<(K, Record)> {
        self.rows
            .borrow()
            .iter()
            .map(|(key, row)| (key.clone(), row.to_record()))
            .collect()
    }
}

impl<K: TableKey> fmt::Debug for BasicTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicTable")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("rows", &self.len())
            .finish()
    }
}
