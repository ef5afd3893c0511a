use itertools::Itertools;

use super::{check_arity, format_tuple, validate_identifier, Escaper};
use crate::{error::QueryBuildError, schema::Value};

#[derive(Clone, Debug)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl InsertBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            rows: vec![],
        }
    }

    pub fn columns<T: Into<String>>(mut self, columns: impl IntoIterator<Item = T>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one tuple; it must have exactly one value per column.
    pub fn values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    pub fn build<E: Escaper + ?Sized>(&self, escaper: &E) -> Result<String, QueryBuildError> {
        let table = validate_identifier(&self.table)?;
        if self.columns.is_empty() {
            return Err(QueryBuildError::MissingClause("insert columns"));
        }
        if self.rows.is_empty() {
            return Err(QueryBuildError::MissingClause("insert values"));
        }
        let columns = self
            .columns
            .iter()
            .map(|column| validate_identifier(column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tuples = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            check_arity(&format!("insert value set {}", i), columns.len(), row.len())?;
            tuples.push(format_tuple(row, escaper));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.iter().join(","),
            tuples.join(",")
        ))
    }
}
