use itertools::Itertools;

use super::{check_arity, validate_identifier, ColumnRef, Escaper, WhereClause};
use crate::error::QueryBuildError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectColumn {
    Plain(String),
    /// `table.column AS alias`
    Aliased {
        table: String,
        column: String,
        alias: String,
    },
}

impl SelectColumn {
    pub fn aliased(table: impl Into<String>, column: impl Into<String>, alias: impl Into<String>) -> Self {
        SelectColumn::Aliased {
            table: table.into(),
            column: column.into(),
            alias: alias.into(),
        }
    }

    fn to_sql(&self) -> Result<String, QueryBuildError> {
        Ok(match self {
            SelectColumn::Plain(column) => validate_identifier(column)?.to_owned(),
            SelectColumn::Aliased {
                table,
                column,
                alias,
            } => format!(
                "{}.{} AS {}",
                validate_identifier(table)?,
                validate_identifier(column)?,
                validate_identifier(alias)?
            ),
        })
    }
}

#[derive(Clone, Debug)]
enum Projection {
    Wildcard,
    Columns(Vec<SelectColumn>),
}

#[derive(Clone, Debug, Default)]
pub struct SelectBuilder {
    projection: Option<Projection>,
    table: Option<String>,
    join_tables: Vec<String>,
    join_on: Vec<(ColumnRef, ColumnRef)>,
    filter: Option<WhereClause>,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = SelectColumn>) -> Self {
        self.projection = Some(Projection::Columns(columns.into_iter().collect()));
        self
    }

    pub fn wildcard(mut self) -> Self {
        self.projection = Some(Projection::Wildcard);
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Tables to LEFT JOIN, paired in order with [`SelectBuilder::join_on`].
    pub fn left_join<T: Into<String>>(mut self, tables: impl IntoIterator<Item = T>) -> Self {
        self.join_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn join_on(mut self, pairs: impl IntoIterator<Item = (ColumnRef, ColumnRef)>) -> Self {
        self.join_on = pairs.into_iter().collect();
        self
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.filter = Some(clause);
        self
    }

    pub fn build<E: Escaper + ?Sized>(&self, escaper: &E) -> Result<String, QueryBuildError> {
        let columns = match self
            .projection
            .as_ref()
            .ok_or(QueryBuildError::MissingClause("select columns"))?
        {
            Projection::Wildcard => "*".to_owned(),
            Projection::Columns(columns) if columns.is_empty() => {
                return Err(QueryBuildError::MissingClause("select columns"))
            }
            Projection::Columns(columns) => columns
                .iter()
                .map(SelectColumn::to_sql)
                .collect::<Result<Vec<_>, _>>()?
                .join(","),
        };
        let table = self
            .table
            .as_deref()
            .ok_or(QueryBuildError::MissingClause("primary table"))?;

        let mut sql = format!("SELECT {} FROM {}", columns, validate_identifier(table)?);

        check_arity("join predicates", self.join_tables.len(), self.join_on.len())?;
        for (table, (lhs, rhs)) in self.join_tables.iter().zip_eq(&self.join_on) {
            sql.push_str(&format!(
                " LEFT JOIN {} ON ({}={})",
                validate_identifier(table)?,
                lhs.to_sql()?,
                rhs.to_sql()?
            ));
        }

        if let Some(filter) = &self.filter {
            sql.push(' ');
            sql.push_str(&filter.to_sql(escaper));
        }
        Ok(sql)
    }
}
