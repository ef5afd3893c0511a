//! Typed commands parsed from a request batch.
//!
//! A batch is `{"requests": [...]}`; each request names its command in
//! `type`. Parsing compiles every filter up front, so a batch that parses
//! is fully resolved before anything touches storage.

mod add;
mod edit;
mod retrieve;
mod trendline;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value as Json;
use tracing::info;

pub use add::Add;
pub use edit::Edit;
pub use retrieve::Retrieve;
pub use trendline::{Measure, Trendline};

use crate::{
    error::{CompileError, Result, ValidationError},
    filter::{self, Filter},
    json::{self, Object},
    path::Path,
    sales,
    schema::Row,
    storage::Storage,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Add(Add),
    Edit(Edit),
    Retrieve(Retrieve),
    Trendline(Trendline),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add(_) => "add",
            Command::Edit(_) => "edit",
            Command::Retrieve(_) => "retrieve",
            Command::Trendline(_) => "trendline",
        }
    }

    /// Runs the command and renders its result as JSON.
    pub fn execute<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<Json> {
        info!(command = self.name(), "executing request");
        match self {
            Command::Add(add) => add.execute(storage),
            Command::Edit(edit) => edit.execute(storage),
            Command::Retrieve(retrieve) => retrieve.execute(storage),
            Command::Trendline(trendline) => trendline.execute(storage),
        }
    }
}

/// Builds one command from its JSON object. `path` points at the request.
pub type CommandCtor = fn(&Object, &Path) -> Result<Command, CompileError>;

/// Maps the `type` discriminator of a request to its constructor.
#[derive(Clone)]
pub struct CommandRegistry {
    ctors: HashMap<&'static str, CommandCtor>,
}

static DEFAULT_REGISTRY: Lazy<CommandRegistry> = Lazy::new(CommandRegistry::default);

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Registers `ctor` under `key`.
    ///
    /// # Panics
    ///
    /// If `key` is already registered.
    pub fn register(&mut self, key: &'static str, ctor: CommandCtor) -> &mut Self {
        let previous = self.ctors.insert(key, ctor);
        assert!(previous.is_none(), "request type {:?} is already defined", key);
        self
    }

    pub fn parse(&self, json: &Json, path: &Path) -> Result<Command, CompileError> {
        let obj = json::object(json, path)?;
        let kind = json::require_str(obj, "type", path)?;
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| ValidationError::UndefinedRequestType {
                name: kind.to_owned(),
                path: path.key("type").to_trail(),
            })?;
        ctor(obj, path)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("add", |obj, path| Add::parse(obj, path).map(Command::Add))
            .register("edit", |obj, path| Edit::parse(obj, path).map(Command::Edit))
            .register("retrieve", |obj, path| {
                Retrieve::parse(obj, path).map(Command::Retrieve)
            })
            .register("trendline", |obj, path| {
                Trendline::parse(obj, path).map(Command::Trendline)
            });
        registry
    }
}

/// Every request of one body, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub commands: Vec<Command>,
}

impl Batch {
    pub fn parse(body: &Json) -> Result<Self, CompileError> {
        Self::parse_with(&DEFAULT_REGISTRY, body)
    }

    pub fn parse_with(registry: &CommandRegistry, body: &Json) -> Result<Self, CompileError> {
        let root = Path::root();
        let body = json::object(body, root)?;
        let requests = json::require_array(body, "requests", root)?;
        let requests_path = root.key("requests");
        let commands = requests
            .iter()
            .enumerate()
            .map(|(i, request)| registry.parse(request, &requests_path.index(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }
}

/// Compiles the optional `filter` of a request.
fn optional_filter(obj: &Object, path: &Path) -> Result<Option<Filter>, CompileError> {
    obj.get("filter")
        .map(|json| filter::compile(json, &path.key("filter")))
        .transpose()
}

/// Rows of the row view that pass `filter`; all rows without one.
fn matching_rows<S: Storage + ?Sized>(storage: &mut S, filter: Option<&Filter>) -> Result<Vec<Row>> {
    let mut rows = sales::fetch_rows(storage)?;
    if let Some(filter) = filter {
        rows.retain(|row| filter.evaluate(row));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_every_request_type() {
        let body = json!({
            "requests": [
                { "type": "add", "records": [] },
                { "type": "retrieve" },
                {
                    "type": "edit",
                    "updateTo": { "quantity": 2 },
                    "filter": { "type": "column", "name": "id", "value": 1 }
                },
                { "type": "trendline", "fit": "linear", "y": "unitsSold", "cumulative": false }
            ]
        });
        let batch = Batch::parse(&body).unwrap();
        let names: Vec<_> = batch.commands.iter().map(Command::name).collect();
        assert_eq!(names, ["add", "retrieve", "edit", "trendline"]);
    }

    #[test]
    fn unknown_request_type() {
        let body = json!({ "requests": [{ "type": "retrieve" }, { "type": "delete" }] });
        let err = Batch::parse(&body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "undefined request type \"delete\" at [requests -> 1 -> type]"
        );
    }

    #[test]
    fn body_shape_is_checked() {
        assert!(matches!(
            Batch::parse(&json!([])),
            Err(CompileError::Validation(ValidationError::NotAnObject { .. }))
        ));
        assert!(matches!(
            Batch::parse(&json!({ "requests": {} })),
            Err(CompileError::Validation(ValidationError::NotAnArray { .. }))
        ));
        assert!(matches!(
            Batch::parse(&json!({ "requests": [7] })),
            Err(CompileError::Validation(ValidationError::NotAnObject { ref key, .. })) if key == "0"
        ));
    }

    #[test]
    fn filter_errors_carry_request_path() {
        let body = json!({
            "requests": [{
                "type": "retrieve",
                "filter": { "type": "column", "name": "colour", "value": 1 }
            }]
        });
        assert_eq!(
            Batch::parse(&body).unwrap_err().to_string(),
            "column \"colour\" is not defined at [requests -> 0 -> filter -> column -> name]"
        );
    }

    #[test]
    fn custom_registry() {
        let mut registry = CommandRegistry::new();
        registry.register("list", |obj, path| Retrieve::parse(obj, path).map(Command::Retrieve));
        let body = json!({ "requests": [{ "type": "list" }] });
        assert_eq!(Batch::parse_with(&registry, &body).unwrap().commands.len(), 1);
        assert!(Batch::parse_with(&registry, &json!({ "requests": [{ "type": "add" }] })).is_err());
    }

    #[test]
    #[should_panic(expected = "already defined")]
    fn duplicate_registration_panics() {
        let mut registry = CommandRegistry::default();
        registry.register("add", |obj, path| Add::parse(obj, path).map(Command::Add));
    }
}
