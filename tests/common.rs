#![allow(dead_code)]
//! Shared helpers for `filter_criteria` integration tests.

use filter_criteria::expr::OperatorExpression;
use filter_criteria::*;

/// Fields `a`, `b`, `c`, `Name`, `Status` (qualified by `Order`) and the status constants.
pub fn catalog() -> Catalog {
    Catalog::new()
        .field("a", Identifier::new("a"), ValueType::Integer)
        .field("b", Identifier::new("b"), ValueType::Integer)
        .field("c", Identifier::new("c"), ValueType::Integer)
        .field("Name", Identifier::new("Name"), ValueType::String)
        .field("Status", Identifier::qualified("Order", "Status"), ValueType::Integer)
        .constant("Placed", 0)
        .constant("InTransit", 2)
        .constant("Delivered", 3)
}

pub fn compile(filter: &str) -> Criteria {
    match parse_with(filter, &catalog()) {
        Ok(criteria) => criteria,
        Err(error) => panic!("failed to compile {filter:?}: {error}"),
    }
}

pub fn compile_err(filter: &str) -> ParseError {
    match parse_with(filter, &catalog()) {
        Ok(criteria) => panic!("expected {filter:?} to fail, got: {criteria:?}"),
        Err(error) => error,
    }
}

pub fn sql(filter: &str) -> String {
    compile(filter).render(Syntax::Sql)
}

pub fn as_and(criteria: &Criteria) -> &Vec<Criteria> {
    match criteria {
        Criteria::And(children) => children,
        other => panic!("expected And, got: {other:?}"),
    }
}

pub fn as_or(criteria: &Criteria) -> &Vec<Criteria> {
    match criteria {
        Criteria::Or(children) => children,
        other => panic!("expected Or, got: {other:?}"),
    }
}

pub fn as_apply(criteria: &Criteria) -> &OperatorExpression {
    match criteria.expression().and_then(|e| e.as_apply()) {
        Some(apply) => apply,
        None => panic!("expected an operator expression, got: {criteria:?}"),
    }
}

pub fn keyword_is(criteria: &Criteria, expected: &str) {
    assert_eq!(as_apply(criteria).operator().keyword(), expected, "{criteria:?}");
}

pub fn parameter_names(criteria: &Criteria) -> Vec<String> {
    criteria.all_parameters().map(|p| p.name.clone()).collect()
}
