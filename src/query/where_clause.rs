use std::fmt;

use itertools::Itertools;

use super::{format_value, validate_identifier, Escaper};
use crate::{datetime::UtcDateTime, error::QueryBuildError, schema::Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullCheck {
    IsNull,
    IsNotNull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Test {
    Compare(Operator, Value),
    Null(NullCheck),
}

/// A validated `column <op> value` or `column IS [NOT] NULL` condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    column: String,
    test: Test,
}

impl Condition {
    pub fn new(column: &str, test: Test) -> Result<Self, QueryBuildError> {
        Ok(Self {
            column: validate_identifier(column)?.to_owned(),
            test,
        })
    }

    fn to_sql<E: Escaper + ?Sized>(&self, escaper: &E) -> String {
        match &self.test {
            Test::Compare(op, value) => {
                format!("{}{}{}", self.column, op, format_value(value, escaper))
            }
            Test::Null(NullCheck::IsNull) => format!("{} IS NULL", self.column),
            Test::Null(NullCheck::IsNotNull) => format!("{} IS NOT NULL", self.column),
        }
    }
}

/// A WHERE clause: one condition, then any number of combinator/condition
/// pairs. The shape makes empty clauses and doubled or dangling combinators
/// unrepresentable.
#[derive(Clone, Debug, PartialEq)]
pub struct WhereClause {
    head: Condition,
    tail: Vec<(Combinator, Condition)>,
}

impl WhereClause {
    pub fn new(head: Condition) -> Self {
        Self { head, tail: vec![] }
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.tail.push((Combinator::And, condition));
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.tail.push((Combinator::Or, condition));
        self
    }

    pub fn to_sql<E: Escaper + ?Sized>(&self, escaper: &E) -> String {
        let tail = self
            .tail
            .iter()
            .map(|(combinator, condition)| format!(" {} {}", combinator, condition.to_sql(escaper)))
            .join("");
        format!("WHERE {}{}", self.head.to_sql(escaper), tail)
    }
}

/// One condition under construction, handed out by [`WhereBuilder::component`].
#[derive(Clone, Debug, Default)]
pub struct Component {
    column: Option<String>,
    operator: Option<Operator>,
    value: Option<Value>,
    null_check: Option<NullCheck>,
}

impl Component {
    pub fn column(&mut self, column: impl Into<String>) -> &mut Self {
        self.column = Some(column.into());
        self
    }

    fn operator(&mut self, operator: Operator) -> &mut Self {
        self.operator = Some(operator);
        self.null_check = None;
        self
    }

    pub fn equals(&mut self) -> &mut Self {
        self.operator(Operator::Eq)
    }

    pub fn not_equals(&mut self) -> &mut Self {
        self.operator(Operator::NotEq)
    }

    pub fn less_than(&mut self) -> &mut Self {
        self.operator(Operator::Lt)
    }

    pub fn greater_than(&mut self) -> &mut Self {
        self.operator(Operator::Gt)
    }

    pub fn less_than_or_equal_to(&mut self) -> &mut Self {
        self.operator(Operator::LtEq)
    }

    pub fn greater_than_or_equal_to(&mut self) -> &mut Self {
        self.operator(Operator::GtEq)
    }

    pub fn value(&mut self, value: Value) -> &mut Self {
        self.value = Some(value);
        self.null_check = None;
        self
    }

    pub fn value_number(&mut self, value: i64) -> &mut Self {
        self.value(Value::Integer(value))
    }

    pub fn value_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.value(Value::Text(value.into()))
    }

    pub fn value_date_time(&mut self, value: UtcDateTime) -> &mut Self {
        self.value(Value::DateTime(value))
    }

    pub fn is_null(&mut self) -> &mut Self {
        self.null_check = Some(NullCheck::IsNull);
        self
    }

    pub fn is_not_null(&mut self) -> &mut Self {
        self.null_check = Some(NullCheck::IsNotNull);
        self
    }

    fn build(&self) -> Result<Condition, QueryBuildError> {
        let column = self
            .column
            .as_deref()
            .ok_or(QueryBuildError::MissingClause("component column"))?;
        let test = match self.null_check {
            Some(check) => Test::Null(check),
            None => {
                let operator = self
                    .operator
                    .ok_or(QueryBuildError::MissingClause("component operator"))?;
                let value = self
                    .value
                    .clone()
                    .ok_or(QueryBuildError::MissingClause("component value"))?;
                Test::Compare(operator, value)
            }
        };
        Condition::new(column, test)
    }
}

#[derive(Clone, Debug)]
enum Node {
    Component(Component),
    Combinator(Combinator),
}

/// Fluent accumulator for a [`WhereClause`]; the alternation of components
/// and combinators is checked by [`WhereBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct WhereBuilder {
    nodes: Vec<Node>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&mut self) -> &mut Component {
        self.nodes.push(Node::Component(Component::default()));
        match self.nodes.last_mut() {
            Some(Node::Component(component)) => component,
            _ => unreachable!(),
        }
    }

    pub fn cmb_and(&mut self) -> &mut Self {
        self.nodes.push(Node::Combinator(Combinator::And));
        self
    }

    pub fn cmb_or(&mut self) -> &mut Self {
        self.nodes.push(Node::Combinator(Combinator::Or));
        self
    }

    pub fn build(&self) -> Result<WhereClause, QueryBuildError> {
        let mut nodes = self.nodes.iter();
        let head = match nodes.next() {
            Some(Node::Component(component)) => component.build()?,
            Some(Node::Combinator(_)) => {
                return Err(QueryBuildError::StructuralViolation(
                    "a where clause cannot start with a combinator",
                ))
            }
            None => {
                return Err(QueryBuildError::StructuralViolation(
                    "a where clause must have at least one component",
                ))
            }
        };

        let mut clause = WhereClause::new(head);
        while let Some(node) = nodes.next() {
            let combinator = match node {
                Node::Combinator(combinator) => *combinator,
                Node::Component(_) => {
                    return Err(QueryBuildError::StructuralViolation(
                        "cannot put a component directly after another component",
                    ))
                }
            };
            let condition = match nodes.next() {
                Some(Node::Component(component)) => component.build()?,
                Some(Node::Combinator(_)) => {
                    return Err(QueryBuildError::StructuralViolation(
                        "cannot put a combinator directly after another combinator",
                    ))
                }
                None => {
                    return Err(QueryBuildError::StructuralViolation(
                        "cannot end a where clause on a combinator",
                    ))
                }
            };
            clause.tail.push((combinator, condition));
        }
        Ok(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlEscaper;

    #[test]
    fn single_component() {
        let mut builder = WhereBuilder::new();
        builder.component().column("id").equals().value_number(5);
        assert_eq!(builder.build().unwrap().to_sql(&SqlEscaper), "WHERE id=5");
    }

    #[test]
    fn chained_components() {
        let mut builder = WhereBuilder::new();
        builder
            .component()
            .column("username")
            .equals()
            .value_string("bob's");
        builder.cmb_and();
        builder.component().column("quantity").greater_than_or_equal_to().value_number(2);
        builder.cmb_or();
        builder.component().column("name").is_not_null();

        assert_eq!(
            builder.build().unwrap().to_sql(&SqlEscaper),
            "WHERE username='bob''s' AND quantity>=2 OR name IS NOT NULL"
        );
    }

    #[test]
    fn doubled_combinator_is_rejected() {
        let mut builder = WhereBuilder::new();
        builder.component().column("id").equals().value_number(1);
        builder.cmb_and().cmb_and();
        builder.component().column("id").equals().value_number(2);
        assert!(matches!(
            builder.build(),
            Err(QueryBuildError::StructuralViolation(_))
        ));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            WhereBuilder::new().build(),
            Err(QueryBuildError::StructuralViolation(_))
        ));

        let mut dangling = WhereBuilder::new();
        dangling.component().column("id").equals().value_number(1);
        dangling.cmb_or();
        assert!(matches!(
            dangling.build(),
            Err(QueryBuildError::StructuralViolation(_))
        ));

        let mut adjacent = WhereBuilder::new();
        adjacent.component().column("id").equals().value_number(1);
        adjacent.component().column("id").equals().value_number(2);
        assert!(matches!(
            adjacent.build(),
            Err(QueryBuildError::StructuralViolation(_))
        ));

        let mut leading = WhereBuilder::new();
        leading.cmb_and();
        leading.component().column("id").equals().value_number(1);
        assert!(matches!(
            leading.build(),
            Err(QueryBuildError::StructuralViolation(_))
        ));
    }

    #[test]
    fn incomplete_components() {
        let mut no_value = WhereBuilder::new();
        no_value.component().column("id").equals();
        assert_eq!(
            no_value.build(),
            Err(QueryBuildError::MissingClause("component value"))
        );

        let mut bad_column = WhereBuilder::new();
        bad_column.component().column("id=1 OR 1").equals().value_number(1);
        assert!(matches!(
            bad_column.build(),
            Err(QueryBuildError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn null_check_overrides_comparison() {
        let mut builder = WhereBuilder::new();
        builder.component().column("name").equals().value_string("x").is_null();
        assert_eq!(builder.build().unwrap().to_sql(&SqlEscaper), "WHERE name IS NULL");
    }
}
