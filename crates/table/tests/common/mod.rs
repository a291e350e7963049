//! Shared fixtures for dido-table integration tests.

#![allow(dead_code)]

use dido_core::{DataType, PartialUpdate, Record, Schema, Value};
use dido_table::{BasicTable, KeyedSubscriber, Receiver};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

/// Records every event it receives as a line of text.
#[derive(Default)]
pub struct EventLog {
    events: RefCell<Vec<String>>,
}

impl EventLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl<K: Debug> KeyedSubscriber<K> for EventLog {
    fn on_data(&self, key: &K, data: &Record) {
        self.events
            .borrow_mut()
            .push(format!("data {:?} {}", key, data));
    }

    fn on_partial(&self, key: &K, update: &PartialUpdate) {
        self.events
            .borrow_mut()
            .push(format!("partial {:?} {}", key, update));
    }

    fn on_delete(&self, key: &K, data: &Record) {
        self.events
            .borrow_mut()
            .push(format!("delete {:?} {}", key, data));
    }
}

pub fn fruit_schema() -> Schema {
    Schema::try_from(
        &[
            ("Id", DataType::String),
            ("Fruit", DataType::String),
            ("GrocerId", DataType::String),
            ("Price", DataType::Float64),
        ][..],
    )
    .unwrap()
}

pub fn grocer_schema() -> Schema {
    Schema::try_from(&[("Id", DataType::String), ("Name", DataType::String)][..]).unwrap()
}

pub fn fruit(id: &str, name: &str, grocer: &str, price: f64) -> Record {
    Record::of(
        &fruit_schema(),
        vec![id.into(), name.into(), grocer.into(), price.into()],
    )
    .unwrap()
}

pub fn grocer(id: &str, name: &str) -> Record {
    Record::of(&grocer_schema(), vec![id.into(), name.into()]).unwrap()
}

/// A record carrying only the key field.
pub fn key_of(schema: &Schema, id: &str) -> Record {
    Record::builder(schema)
        .set_at(1, Value::from(id))
        .unwrap()
        .build()
        .project(&[1])
        .unwrap()
}

pub fn fruit_table() -> Rc<BasicTable<String>> {
    let table = BasicTable::with_schema(fruit_schema())
        .name("fruit")
        .create()
        .unwrap();
    table.upsert(&fruit("F1", "Apple", "G2", 23.5)).unwrap();
    table.upsert(&fruit("F2", "Orange", "G2", 47.2)).unwrap();
    table.upsert(&fruit("F3", "Pear", "G1", 12.0)).unwrap();
    Rc::new(table)
}

pub fn grocer_table() -> Rc<BasicTable<String>> {
    let table = BasicTable::with_schema(grocer_schema())
        .name("grocer")
        .create()
        .unwrap();
    table.upsert(&grocer("G1", "Jones")).unwrap();
    table.upsert(&grocer("G2", "Smith")).unwrap();
    Rc::new(table)
}

pub fn s(text: &str) -> String {
    String::from(text)
}
