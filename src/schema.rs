//! The relational schema and the typed row view the filters run against.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::datetime::UtcDateTime;

pub const ACCOUNTS: &str = "accounts";
pub const ACCOUNTS_USERNAME: &str = "username";
pub const ACCOUNTS_PASSWORD: &str = "password";

pub const PRODUCTS: &str = "products";
pub const PRODUCTS_ID: &str = "id";
pub const PRODUCTS_NAME: &str = "name";
pub const PRODUCTS_UNIT_VALUE: &str = "unitValueCents";

pub const SALES: &str = "sales";
pub const SALES_ID: &str = "id";
pub const SALES_PRODUCT: &str = "productId";
pub const SALES_QUANTITY: &str = "quantity";
pub const SALES_DATE_TIME: &str = "dateTime";

/// Statements run on every connection before anything else.
pub const BOOTSTRAP: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    "CREATE TABLE IF NOT EXISTS accounts (
        username VARCHAR(32) NOT NULL PRIMARY KEY,
        password VARCHAR(128) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(64) NOT NULL,
        unitValueCents INTEGER NOT NULL CHECK (unitValueCents >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS sales (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        productId INTEGER NOT NULL,
        quantity INTEGER NOT NULL,
        dateTime CHAR(16) NOT NULL,
        CONSTRAINT fk_product FOREIGN KEY (productId) REFERENCES products(id)
    )",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    String,
    DateTime,
}

impl ColumnType {
    pub fn is_ordered(self) -> bool {
        !matches!(self, ColumnType::String)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Integer => "integer",
            ColumnType::String => "string",
            ColumnType::DateTime => "datetime",
        })
    }
}

/// A column of the joined sale/product row view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub table: &'static str,
    pub source: &'static str,
}

pub const ROW_ID: &str = "id";
pub const ROW_PRODUCT: &str = "product";
pub const ROW_QUANTITY: &str = "quantity";
pub const ROW_DATE_TIME: &str = "dateTime";
pub const ROW_NAME: &str = "name";
pub const ROW_UNIT_VALUE: &str = "unitValueCents";

pub const ROW_COLUMNS: &[Column] = &[
    Column {
        name: ROW_ID,
        kind: ColumnType::Integer,
        table: SALES,
        source: SALES_ID,
    },
    Column {
        name: ROW_PRODUCT,
        kind: ColumnType::Integer,
        table: SALES,
        source: SALES_PRODUCT,
    },
    Column {
        name: ROW_QUANTITY,
        kind: ColumnType::Integer,
        table: SALES,
        source: SALES_QUANTITY,
    },
    Column {
        name: ROW_DATE_TIME,
        kind: ColumnType::DateTime,
        table: SALES,
        source: SALES_DATE_TIME,
    },
    Column {
        name: ROW_NAME,
        kind: ColumnType::String,
        table: PRODUCTS,
        source: PRODUCTS_NAME,
    },
    Column {
        name: ROW_UNIT_VALUE,
        kind: ColumnType::Integer,
        table: PRODUCTS,
        source: PRODUCTS_UNIT_VALUE,
    },
];

pub fn column(name: &str) -> Option<&'static Column> {
    ROW_COLUMNS.iter().find(|column| column.name == name)
}

/// A single cell, either read from storage or written into SQL.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    DateTime(UtcDateTime),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<&UtcDateTime> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Text(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<UtcDateTime> for Value {
    fn from(dt: UtcDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// A row keyed by column name. Missing columns read as [`Value::Null`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.0.get(column).unwrap_or(NULL)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
