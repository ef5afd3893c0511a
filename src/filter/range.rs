use std::{cmp::Ordering, fmt};

use crate::schema::{ColumnType, Value};

/// How cells of a column are compared, resolved once from the column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Integer,
    Text,
    DateTime,
}

impl From<ColumnType> for Comparator {
    fn from(kind: ColumnType) -> Self {
        match kind {
            ColumnType::Integer => Comparator::Integer,
            ColumnType::String => Comparator::Text,
            ColumnType::DateTime => Comparator::DateTime,
        }
    }
}

impl Comparator {
    /// Orders two cells, or `None` when they cannot be ordered (text, null or
    /// mismatched kinds).
    pub fn compare(self, a: &Value, b: &Value) -> Option<Ordering> {
        match (self, a, b) {
            (Comparator::Integer, Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Comparator::DateTime, Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn equate(self, a: &Value, b: &Value) -> bool {
        match (self, a, b) {
            (Comparator::Text, Value::Text(a), Value::Text(b)) => a == b,
            _ => self.compare(a, b) == Some(Ordering::Equal),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

impl Bound {
    pub fn new(value: Value, inclusive: bool) -> Self {
        Self { value, inclusive }
    }

    pub fn admits_above(&self, comparator: Comparator, arg: &Value) -> bool {
        match comparator.compare(arg, &self.value) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.inclusive,
            _ => false,
        }
    }

    pub fn admits_below(&self, comparator: Comparator, arg: &Value) -> bool {
        match comparator.compare(arg, &self.value) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.inclusive,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Range {
    pub lower: Bound,
    pub upper: Bound,
}

impl Range {
    pub fn new(lower: Bound, upper: Bound) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, comparator: Comparator, arg: &Value) -> bool {
        self.lower.admits_above(comparator, arg) && self.upper.admits_below(comparator, arg)
    }
}

fn fmt_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Integer(n) => write!(f, "{}", n),
        Value::Text(s) => write!(f, "{:?}", s),
        Value::DateTime(dt) => write!(f, "{}", dt),
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.lower.inclusive { "[" } else { "(" })?;
        fmt_value(&self.lower.value, f)?;
        f.write_str(", ")?;
        fmt_value(&self.upper.value, f)?;
        f.write_str(if self.upper.inclusive { "]" } else { ")" })
    }
}
