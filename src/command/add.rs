use serde_json::Value as Json;

use crate::{
    error::{CompileError, Result, ValidationError},
    json::{self, Object},
    path::Path,
    sales::{self, NewSale},
    storage::Storage,
};

/// Inserts new sale records.
#[derive(Clone, Debug, PartialEq)]
pub struct Add {
    pub records: Vec<NewSale>,
}

fn record(json: &Json, path: &Path) -> Result<NewSale, ValidationError> {
    let obj = json::object(json, path)?;
    let product = json::require_i64(obj, "product", path)?;
    let quantity = json::require_i64(obj, "quantity", path)?;
    let quantity = json::expect_at_least(quantity, 1, "quantity", path)?;
    let date_time = json::expect_date_time(json::require(obj, "dateTime", path)?, "dateTime", path)?;
    Ok(NewSale {
        product,
        quantity,
        date_time,
    })
}

impl Add {
    pub fn parse(obj: &Object, path: &Path) -> Result<Self, CompileError> {
        let records = json::require_array(obj, "records", path)?;
        let records_path = path.key("records");
        let records = records
            .iter()
            .enumerate()
            .map(|(i, json)| record(json, &records_path.index(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    pub fn execute<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<Json> {
        sales::insert(storage, &self.records)?;
        Ok(Json::Null)
    }
}
