use itertools::Itertools;

use super::{check_arity, format_value, validate_identifier, Escaper, WhereClause};
use crate::{error::QueryBuildError, schema::Value};

/// An UPDATE statement. It refuses to build without a WHERE clause.
#[derive(Clone, Debug)]
pub struct UpdateBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
    filter: Option<WhereClause>,
}

impl UpdateBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            values: vec![],
            filter: None,
        }
    }

    pub fn columns<T: Into<String>>(mut self, columns: impl IntoIterator<Item = T>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.filter = Some(clause);
        self
    }

    pub fn build<E: Escaper + ?Sized>(&self, escaper: &E) -> Result<String, QueryBuildError> {
        let table = validate_identifier(&self.table)?;
        if self.columns.is_empty() {
            return Err(QueryBuildError::MissingClause("update columns"));
        }
        let filter = self
            .filter
            .as_ref()
            .ok_or(QueryBuildError::MissingClause("update where clause"))?;
        check_arity("update values", self.columns.len(), self.values.len())?;

        let assignments = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| {
                Ok(format!(
                    "{}={}",
                    validate_identifier(column)?,
                    format_value(value, escaper)
                ))
            })
            .collect::<Result<Vec<_>, QueryBuildError>>()?;

        Ok(format!(
            "UPDATE {} SET {} {}",
            table,
            assignments.iter().join(","),
            filter.to_sql(escaper)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SqlEscaper, WhereBuilder};

    fn id_is(id: i64) -> WhereClause {
        let mut clause = WhereBuilder::new();
        clause.component().column("id").equals().value_number(id);
        clause.build().unwrap()
    }

    #[test]
    fn renders_assignments() {
        let sql = UpdateBuilder::new("sales")
            .columns(["quantity", "productId"])
            .values([Value::Integer(3), Value::Integer(9)])
            .filter(id_is(4))
            .build(&SqlEscaper)
            .unwrap();
        assert_eq!(sql, "UPDATE sales SET quantity=3,productId=9 WHERE id=4");
    }

    #[test]
    fn refuses_full_table_update() {
        let err = UpdateBuilder::new("sales")
            .columns(["quantity"])
            .values([Value::Integer(3)])
            .build(&SqlEscaper)
            .unwrap_err();
        assert_eq!(err, QueryBuildError::MissingClause("update where clause"));
    }

    #[test]
    fn arity_mismatch() {
        let err = UpdateBuilder::new("sales")
            .columns(["quantity", "productId"])
            .values([Value::Integer(3)])
            .filter(id_is(1))
            .build(&SqlEscaper)
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::ArityMismatch { expected: 2, found: 1, .. }));
    }
}
