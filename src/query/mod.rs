//! SQL text builders.
//!
//! Every identifier is checked against `[A-Za-z0-9$_]+` and every value goes
//! through [`format_value`], so nothing reaches the SQL text unescaped. All
//! builders defer their checks to `build()`, which either returns complete
//! SQL or the first violated rule.

mod insert;
mod select;
mod update;
mod where_clause;

use itertools::Itertools;

pub use insert::InsertBuilder;
pub use select::{SelectBuilder, SelectColumn};
pub use update::UpdateBuilder;
pub use where_clause::{
    Combinator, Component, Condition, NullCheck, Operator, Test, WhereBuilder, WhereClause,
};

use crate::{error::QueryBuildError, schema::Value};

/// Escapes string literals the way the storage engine expects. The result is
/// placed between single quotes by the builders.
pub trait Escaper {
    fn escape(&self, raw: &str) -> String;
}

/// Standard SQL escaping: single quotes are doubled.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlEscaper;

impl Escaper for SqlEscaper {
    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }
}

pub fn validate_identifier(ident: &str) -> Result<&str, QueryBuildError> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '$' || c == '_');
    if valid {
        Ok(ident)
    } else {
        Err(QueryBuildError::InvalidIdentifier(ident.to_owned()))
    }
}

pub fn format_value<E: Escaper + ?Sized>(value: &Value, escaper: &E) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Integer(n) => n.to_string(),
        Value::Text(s) => format!("'{}'", escaper.escape(s)),
        Value::DateTime(dt) => format!("'{}'", dt),
    }
}

fn format_tuple<E: Escaper + ?Sized>(values: &[Value], escaper: &E) -> String {
    format!(
        "({})",
        values.iter().map(|value| format_value(value, escaper)).join(",")
    )
}

/// A column, optionally qualified by its table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    fn to_sql(&self) -> Result<String, QueryBuildError> {
        let column = validate_identifier(&self.column)?;
        Ok(match &self.table {
            Some(table) => format!("{}.{}", validate_identifier(table)?, column),
            None => column.to_owned(),
        })
    }
}

/// Checks that every tuple has `expected` values.
fn check_arity(what: &str, expected: usize, found: usize) -> Result<(), QueryBuildError> {
    if expected != found {
        return Err(QueryBuildError::ArityMismatch {
            what: what.to_owned(),
            expected,
            found,
        });
    }
    Ok(())
}
