use serde_json::Value as Json;

use super::{matching_rows, optional_filter};
use crate::{
    error::{CompileError, Result},
    filter::Filter,
    json::Object,
    path::Path,
    storage::Storage,
};

/// Lists the sales a filter matches, or every sale without one.
#[derive(Clone, Debug, PartialEq)]
pub struct Retrieve {
    pub filter: Option<Filter>,
}

impl Retrieve {
    pub fn parse(obj: &Object, path: &Path) -> Result<Self, CompileError> {
        Ok(Self {
            filter: optional_filter(obj, path)?,
        })
    }

    pub fn execute<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<Json> {
        let rows = matching_rows(storage, self.filter.as_ref())?;
        Ok(serde_json::to_value(rows)?)
    }
}
