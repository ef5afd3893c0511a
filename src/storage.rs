//! The storage collaborator: executes SQL text and escapes literals.

use std::path::Path;

use rusqlite::{types::ValueRef, Connection};
use tracing::debug;

use crate::{
    error::StorageError,
    query::{Escaper, SqlEscaper},
    schema::{self, Row, Value},
};

/// What a statement produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Rows(Vec<Row>),
    Affected(usize),
}

impl Outcome {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Affected(_) => vec![],
        }
    }

    pub fn affected(&self) -> usize {
        match self {
            Outcome::Rows(rows) => rows.len(),
            Outcome::Affected(count) => *count,
        }
    }
}

pub trait Storage: Escaper {
    /// Runs one statement. Text cells come back as [`Value::Text`]; typing
    /// them is up to the caller.
    fn execute(&mut self, sql: &str) -> Result<Outcome, StorageError>;
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StorageError> {
        for statement in schema::BOOTSTRAP {
            conn.execute_batch(statement)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn convert(column: &str, value: ValueRef<'_>) -> Result<Value, StorageError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Integer(n)),
        ValueRef::Text(bytes) => Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Real(_) => Err(StorageError::UnsupportedValue {
            column: column.to_owned(),
            kind: "real",
        }),
        ValueRef::Blob(_) => Err(StorageError::UnsupportedValue {
            column: column.to_owned(),
            kind: "blob",
        }),
    }
}

impl Escaper for SqliteStorage {
    fn escape(&self, raw: &str) -> String {
        SqlEscaper.escape(raw)
    }
}

impl Storage for SqliteStorage {
    fn execute(&mut self, sql: &str) -> Result<Outcome, StorageError> {
        debug!(%sql, "executing statement");
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            let affected = stmt.execute([])?;
            return Ok(Outcome::Affected(affected));
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let mut rows = stmt.query([])?;
        let mut result = vec![];
        while let Some(row) = rows.next()? {
            let mut converted = Row::new();
            for (i, name) in names.iter().enumerate() {
                converted.insert(name.as_str(), convert(name, row.get_ref(i)?)?);
            }
            result.push(converted);
        }
        debug!(rows = result.len(), "statement returned rows");
        Ok(Outcome::Rows(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstraps_idempotently() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        for statement in schema::BOOTSTRAP {
            storage.connection().execute_batch(statement).unwrap();
        }
        let tables = storage
            .execute("SELECT name FROM sqlite_master WHERE type='table' AND name IN ('accounts','products','sales') ORDER BY name")
            .unwrap()
            .into_rows();
        let names: Vec<_> = tables.iter().map(|row| row.get("name").clone()).collect();
        assert_eq!(
            names,
            [Value::from("accounts"), Value::from("products"), Value::from("sales")]
        );
    }

    #[test]
    fn reports_affected_rows() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let outcome = storage
            .execute("INSERT INTO products (name,unitValueCents) VALUES ('a',1),('b',2)")
            .unwrap();
        assert_eq!(outcome, Outcome::Affected(2));
    }

    #[test]
    fn enforces_product_foreign_key() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let err = storage
            .execute("INSERT INTO sales (productId,quantity,dateTime) VALUES (42,1,'20230101T000000Z')")
            .unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn escapes_quotes() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.escape("it's"), "it''s");
    }
}
