use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value as Json;

use super::{Bound, Comparator, Filter, LogicOp, PivotOp, Range};
use crate::{
    error::{CompileError, ValidationError},
    json::{self, Object},
    path::Path,
    schema::{self, Column, ColumnType, Value},
};

/// Builds one filter node from its JSON object. `path` already includes the
/// node's type.
pub type FilterCtor = fn(&Object, &Path, &FilterRegistry) -> Result<Filter, CompileError>;

/// Maps the `type` discriminator of a filter node to its constructor.
#[derive(Clone)]
pub struct FilterRegistry {
    ctors: HashMap<&'static str, FilterCtor>,
}

static DEFAULT_REGISTRY: Lazy<FilterRegistry> = Lazy::new(FilterRegistry::default);

/// Compiles `json` with the built-in filter types.
pub fn compile(json: &Json, path: &Path) -> Result<Filter, CompileError> {
    DEFAULT_REGISTRY.compile(json, path)
}

impl FilterRegistry {
    /// An empty registry; see [`FilterRegistry::default`] for the built-ins.
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
    pub fn register(&mut self, key: &'static str, ctor: FilterCtor) -> &mut Self {
        let previous = self.ctors.insert(key, ctor);
        assert!(previous.is_none(), "filter type {:?} is already defined", key);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ctors.contains_key(key)
    }

    pub fn compile(&self, json: &Json, path: &Path) -> Result<Filter, CompileError> {
        let obj = json::object(json, path)?;
        let kind = json::require_str(obj, "type", path)?;
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| CompileError::UndefinedFilterType {
                name: kind.to_owned(),
                path: path.to_trail(),
            })?;
        ctor(obj, &path.key(kind), self)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("column", column_filter)
            .register("logicNot", not_filter)
            .register("logicAnd", |obj, path, reg| logic_filter(LogicOp::And, obj, path, reg))
            .register("logicOr", |obj, path, reg| logic_filter(LogicOp::Or, obj, path, reg))
            .register("logicNand", |obj, path, reg| logic_filter(LogicOp::Nand, obj, path, reg))
            .register("logicNor", |obj, path, reg| logic_filter(LogicOp::Nor, obj, path, reg))
            .register("logicXor", |obj, path, reg| logic_filter(LogicOp::Xor, obj, path, reg))
            .register("logicXnor", |obj, path, reg| logic_filter(LogicOp::Xnor, obj, path, reg))
            .register("logicLt", |obj, path, reg| pivot_filter(PivotOp::Lt, obj, path, reg))
            .register("logicGt", |obj, path, reg| pivot_filter(PivotOp::Gt, obj, path, reg))
            .register("logicLe", |obj, path, reg| pivot_filter(PivotOp::Le, obj, path, reg))
            .register("logicGe", |obj, path, reg| pivot_filter(PivotOp::Ge, obj, path, reg));
        registry
    }
}

/// Reads a literal for `column`, checking it against the column type.
fn literal(column: &Column, value: &Json, key: &str, path: &Path) -> Result<Value, ValidationError> {
    Ok(match column.kind {
        ColumnType::Integer => Value::Integer(json::expect_i64(value, key, path)?),
        ColumnType::String => Value::Text(json::expect_str(value, key, path)?.to_owned()),
        ColumnType::DateTime => Value::DateTime(json::expect_date_time(value, key, path)?),
    })
}

fn bound(
    column: &Column,
    range: &Object,
    value_key: &str,
    inclusive_key: &str,
    path: &Path,
) -> Result<Bound, ValidationError> {
    let value = literal(column, json::require(range, value_key, path)?, value_key, path)?;
    let inclusive = json::require_bool(range, inclusive_key, path)?;
    Ok(Bound::new(value, inclusive))
}

fn column_filter(obj: &Object, path: &Path, _: &FilterRegistry) -> Result<Filter, CompileError> {
    let name = json::require_str(obj, "name", path)?;
    let column = schema::column(name).ok_or_else(|| CompileError::UnknownColumn {
        name: name.to_owned(),
        path: path.key("name").to_trail(),
    })?;
    let comparator = Comparator::from(column.kind);

    match (obj.get("value"), obj.get("inRange")) {
        (Some(value), None) => Ok(Filter::ColumnValue {
            column: column.name.to_owned(),
            comparator,
            value: literal(column, value, "value", path)?,
        }),

        (None, Some(range)) => {
            let range_path = path.key("inRange");
            if !column.kind.is_ordered() {
                return Err(CompileError::NotComparable {
                    column: column.name.to_owned(),
                    kind: "string",
                    path: range_path.to_trail(),
                });
            }
            let range = json::object(range, &range_path)?;
            let lower = bound(column, range, "low", "lowInclusive", &range_path)?;
            let upper = bound(column, range, "high", "highInclusive", &range_path)?;
            Ok(Filter::ColumnRange {
                column: column.name.to_owned(),
                comparator,
                range: Range::new(lower, upper),
            })
        }

        (Some(_), Some(_)) => Err(CompileError::StructuralViolation {
            message: "only one of \"value\" or \"inRange\" may be set".to_owned(),
            path: path.to_trail(),
        }),

        (None, None) => Err(ValidationError::UndefinedKey {
            key: "value or inRange".to_owned(),
            path: path.to_trail(),
        }
        .into()),
    }
}

fn not_filter(obj: &Object, path: &Path, registry: &FilterRegistry) -> Result<Filter, CompileError> {
    let child = json::require(obj, "child", path)?;
    let child = registry.compile(child, &path.key("child"))?;
    Ok(Filter::Not(Box::new(child)))
}

fn children(obj: &Object, path: &Path, registry: &FilterRegistry) -> Result<Vec<Filter>, CompileError> {
    let children = json::require_array(obj, "children", path)?;
    let children_path = path.key("children");
    children
        .iter()
        .enumerate()
        .map(|(i, child)| registry.compile(child, &children_path.index(i)))
        .collect()
}

fn logic_filter(
    op: LogicOp,
    obj: &Object,
    path: &Path,
    registry: &FilterRegistry,
) -> Result<Filter, CompileError> {
    Ok(Filter::Logic {
        op,
        children: children(obj, path, registry)?,
    })
}

fn pivot_filter(
    op: PivotOp,
    obj: &Object,
    path: &Path,
    registry: &FilterRegistry,
) -> Result<Filter, CompileError> {
    let pivot = json::require_i64(obj, "pivot", path)?;
    Ok(Filter::Pivot {
        op,
        pivot,
        children: children(obj, path, registry)?,
    })
}
