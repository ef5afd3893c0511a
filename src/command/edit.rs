use serde_json::Value as Json;

use super::matching_rows;
use crate::{
    error::{CompileError, Result, ValidationError},
    filter::{self, Filter},
    json::{self, Object},
    path::Path,
    sales::{self, SaleUpdate},
    schema::ROW_ID,
    storage::Storage,
};

/// Overwrites fields of every sale the filter matches.
#[derive(Clone, Debug, PartialEq)]
pub struct Edit {
    pub update_to: SaleUpdate,
    pub filter: Filter,
}

fn update_to(obj: &Object, path: &Path) -> Result<SaleUpdate, ValidationError> {
    let product = obj
        .get("product")
        .map(|value| json::expect_i64(value, "product", path))
        .transpose()?;
    let quantity = obj
        .get("quantity")
        .map(|value| {
            json::expect_i64(value, "quantity", path)
                .and_then(|quantity| json::expect_at_least(quantity, 1, "quantity", path))
        })
        .transpose()?;
    let date_time = obj
        .get("dateTime")
        .map(|value| json::expect_date_time(value, "dateTime", path))
        .transpose()?;

    let update = SaleUpdate {
        product,
        quantity,
        date_time,
    };
    if update.is_empty() {
        return Err(ValidationError::UndefinedKey {
            key: "product, quantity or dateTime".to_owned(),
            path: path.to_trail(),
        });
    }
    Ok(update)
}

impl Edit {
    pub fn parse(obj: &Object, path: &Path) -> Result<Self, CompileError> {
        let update = update_to(json::require_object(obj, "updateTo", path)?, &path.key("updateTo"))?;
        let filter = filter::compile(json::require(obj, "filter", path)?, &path.key("filter"))?;
        Ok(Self {
            update_to: update,
            filter,
        })
    }

    /// Returns the number of sales updated.
    pub fn execute<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<Json> {
        let ids: Vec<i64> = matching_rows(storage, Some(&self.filter))?
            .iter()
            .filter_map(|row| row.get(ROW_ID).as_integer())
            .collect();
        let updated = sales::update(storage, &ids, &self.update_to)?;
        Ok(Json::from(updated))
    }
}
