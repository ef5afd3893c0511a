//! Row predicates compiled from JSON filter expressions.

pub mod compiler;
mod range;

pub use compiler::{compile, FilterRegistry};
pub use range::{Bound, Comparator, Range};

use crate::schema::{Row, Value};

/// Truth functions over the children of an N-ary node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}

impl LogicOp {
    pub fn apply(self, true_count: usize, total: usize) -> bool {
        match self {
            LogicOp::And => true_count == total,
            LogicOp::Or => true_count > 0,
            // Zero children is true here as well, unlike `!And`.
            LogicOp::Nand => total == 0 || true_count != total,
            LogicOp::Nor => true_count == 0,
            LogicOp::Xor => true_count % 2 != 0,
            LogicOp::Xnor => true_count % 2 == 0,
        }
    }
}

/// Comparisons of the number of true children against a pivot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PivotOp {
    Lt,
    Gt,
    Le,
    Ge,
}

impl PivotOp {
    pub fn apply(self, true_count: usize, pivot: i64) -> bool {
        let count = true_count as i64;
        match self {
            PivotOp::Lt => count < pivot,
            PivotOp::Gt => count > pivot,
            PivotOp::Le => count <= pivot,
            PivotOp::Ge => count >= pivot,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    ColumnValue {
        column: String,
        comparator: Comparator,
        value: Value,
    },
    ColumnRange {
        column: String,
        comparator: Comparator,
        range: Range,
    },
    Not(Box<Filter>),
    Logic {
        op: LogicOp,
        children: Vec<Filter>,
    },
    Pivot {
        op: PivotOp,
        pivot: i64,
        children: Vec<Filter>,
    },
}

impl Filter {
    pub fn evaluate(&self, row: &Row) -> bool {
        match self {
            Filter::ColumnValue {
                column,
                comparator,
                value,
            } => comparator.equate(row.get(column), value),
            Filter::ColumnRange {
                column,
                comparator,
                range,
            } => range.contains(*comparator, row.get(column)),
            Filter::Not(child) => !child.evaluate(row),
            Filter::Logic { op, children } => op.apply(count_true(children, row), children.len()),
            Filter::Pivot {
                op,
                pivot,
                children,
            } => op.apply(count_true(children, row), *pivot),
        }
    }
}

/// Evaluates every child in declared order; no short-circuiting.
fn count_true(children: &[Filter], row: &Row) -> usize {
    children.iter().filter(|child| child.evaluate(row)).count()
}
