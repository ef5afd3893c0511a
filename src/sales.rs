//! Reads and writes of the sale/product row view.

use itertools::Itertools;
use tracing::debug;

use crate::{
    datetime::UtcDateTime,
    error::{Result, StorageError},
    query::{ColumnRef, InsertBuilder, SelectBuilder, SelectColumn, UpdateBuilder, WhereBuilder},
    schema::{self, ColumnType, Row, Value, ROW_COLUMNS},
    storage::Storage,
};

/// The SELECT behind every row-view read: each sale joined with its product.
pub fn view_query() -> SelectBuilder {
    SelectBuilder::new()
        .columns(
            ROW_COLUMNS
                .iter()
                .map(|column| SelectColumn::aliased(column.table, column.source, column.name)),
        )
        .from(schema::SALES)
        .left_join([schema::PRODUCTS])
        .join_on([(
            ColumnRef::qualified(schema::SALES, schema::SALES_PRODUCT),
            ColumnRef::qualified(schema::PRODUCTS, schema::PRODUCTS_ID),
        )])
}

/// Every sale in storage order, with cells typed per the row view.
pub fn fetch_rows<S: Storage + ?Sized>(storage: &mut S) -> Result<Vec<Row>> {
    let sql = view_query().build(&*storage)?;
    let rows = storage
        .execute(&sql)?
        .into_rows()
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn decode(row: Row) -> Result<Row, StorageError> {
    row.columns()
        .map(|(name, value)| {
            let typed = match (schema::column(name).map(|column| column.kind), value) {
                (Some(ColumnType::DateTime), Value::Text(text)) => {
                    let dt = text.parse::<UtcDateTime>().map_err(|source| {
                        StorageError::InvalidDateTime {
                            column: name.to_owned(),
                            source,
                        }
                    })?;
                    Value::DateTime(dt)
                }
                _ => value.clone(),
            };
            Ok::<_, StorageError>((name.to_owned(), typed))
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSale {
    pub product: i64,
    pub quantity: i64,
    pub date_time: UtcDateTime,
}

/// Inserts all sales with one statement. Nothing is sent for an empty slice.
pub fn insert<S: Storage + ?Sized>(storage: &mut S, sales: &[NewSale]) -> Result<usize> {
    if sales.is_empty() {
        return Ok(0);
    }
    let sql = sales
        .iter()
        .fold(
            InsertBuilder::new(schema::SALES).columns([
                schema::SALES_PRODUCT,
                schema::SALES_QUANTITY,
                schema::SALES_DATE_TIME,
            ]),
            |builder, sale| {
                builder.values([
                    Value::Integer(sale.product),
                    Value::Integer(sale.quantity),
                    Value::DateTime(sale.date_time),
                ])
            },
        )
        .build(&*storage)?;
    let inserted = storage.execute(&sql)?.affected();
    debug!(inserted, "sales inserted");
    Ok(inserted)
}

/// The fields an edit may overwrite. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaleUpdate {
    pub product: Option<i64>,
    pub quantity: Option<i64>,
    pub date_time: Option<UtcDateTime>,
}

impl SaleUpdate {
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut assignments = vec![];
        if let Some(product) = self.product {
            assignments.push((schema::SALES_PRODUCT, Value::Integer(product)));
        }
        if let Some(quantity) = self.quantity {
            assignments.push((schema::SALES_QUANTITY, Value::Integer(quantity)));
        }
        if let Some(date_time) = self.date_time {
            assignments.push((schema::SALES_DATE_TIME, Value::DateTime(date_time)));
        }
        assignments
    }
}

/// Ids named by one UPDATE. SQLite bounds expression depth at 1000, and
/// each id adds a level to the OR chain.
const UPDATE_BATCH: usize = 500;

/// Applies `changes` to the sales with the given ids, each id named once.
/// Ids go out in OR chains of at most [`UPDATE_BATCH`]. Returns the number
/// of rows storage reports as updated.
pub fn update<S: Storage + ?Sized>(
    storage: &mut S,
    ids: &[i64],
    changes: &SaleUpdate,
) -> Result<usize> {
    if ids.is_empty() || changes.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i64> = ids.iter().copied().unique().collect();
    let (columns, values): (Vec<_>, Vec<_>) = changes.assignments().into_iter().unzip();
    let mut updated = 0;
    for chunk in ids.chunks(UPDATE_BATCH) {
        let mut clause = WhereBuilder::new();
        for (i, id) in chunk.iter().enumerate() {
            if i > 0 {
                clause.cmb_or();
            }
            clause
                .component()
                .column(schema::SALES_ID)
                .equals()
                .value_number(*id);
        }

        let sql = UpdateBuilder::new(schema::SALES)
            .columns(columns.iter().copied())
            .values(values.iter().cloned())
            .filter(clause.build()?)
            .build(&*storage)?;
        updated += storage.execute(&sql)?.affected();
    }
    debug!(updated, statements = (ids.len() + UPDATE_BATCH - 1) / UPDATE_BATCH, "sales updated");
    Ok(updated)
}
