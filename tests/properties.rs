mod common;
use common::*;
use filter_criteria::operator::{OperatorKind, registry};
use filter_criteria::*;
use std::collections::HashSet;

#[test]
fn filter_rendering_round_trips_for_every_operator() {
    let field = |name: &str| Expression::operand(vec![SqlFragment::Identifier(Identifier::new(name))]);

    let operators = registry().operators().iter().filter(|op| {
        op.is_implemented()
            && !matches!(
                op.kind(),
                OperatorKind::Whitespace | OperatorKind::Grouping | OperatorKind::Binary
            )
    });

    let mut checked = 0;
    for operator in operators {
        let template = operator.template(Syntax::Filter, false);
        let left = if template.contains("{lhs}") { field("a") } else { None };
        let right = if template.contains("{rhs}") { field("b") } else { None };
        let expected = Expression::apply(operator, left, right, None);

        let text = expected.render(Syntax::Filter);
        let criteria = compile(&text);
        assert_eq!(
            criteria,
            Criteria::Expression(expected),
            "Round trip changed {:?} ({})",
            operator.keyword(),
            text
        );
        checked += 1;
    }
    assert!(checked > 30, "only {checked} operators checked");
}

#[test]
fn three_argument_overload_round_trips() {
    let text = "substring(Name,a,b)";
    let criteria = compile(text);
    assert_eq!(criteria.render(Syntax::Filter), text);
    assert!(as_apply(&criteria).right1().is_some());
}

#[test]
fn parameters_are_unique_per_literal() {
    let cases = vec![
        ("a eq 1", 1),
        ("a eq 1 and b eq 1", 2),
        ("a eq 'x' or a eq 'x' or a eq 'y'", 3),
        ("substring(Name,1,3) eq 'Jim' and Status eq InTransit", 4),
        ("(a add 1) eq (b sub 2) and c eq true", 3),
        ("a eq b", 0),
    ];
    for (case, count) in cases {
        let criteria = compile(case);
        let names = parameter_names(&criteria);
        assert_eq!(names.len(), count, "Wrong parameter count for {case:?}: {names:?}");
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "Duplicate names for {case:?}: {names:?}");
        assert!(criteria.distinct_parameters().len() <= count, "{case:?}");
    }
}

#[test]
fn grouping_binds_or_inside_and() {
    let criteria = compile("(a eq 1 or a eq 2) and b eq 3");
    let and = as_and(&criteria);
    assert_eq!(and.len(), 2);
    let or = as_or(&and[0]);
    assert_eq!(or.len(), 2);
    keyword_is(&or[0], "eq");
    keyword_is(&or[1], "eq");
    keyword_is(&and[1], "eq");

    let sql = criteria.render(Syntax::Sql);
    assert_eq!(sql, "(([a] = @Filter0\r\n OR [a] = @Filter1)\r\n AND [b] = @Filter2)");
}

#[test]
fn substring_takes_three_arguments() {
    let criteria = compile("substring(Name,1,3) eq 'Jim'");
    assert_eq!(criteria.render(Syntax::Sql), "SUBSTRING([Name],@Filter0,@Filter1) = @Filter2");

    let eq = as_apply(&criteria);
    assert_eq!(eq.operator().keyword(), "eq");
    let substring = eq.left().and_then(|left| match left {
        Expression::Fragments(fragments) => match fragments.as_slice() {
            [SqlFragment::Expression(call)] => call.as_apply(),
            _ => None,
        },
        other => other.as_apply(),
    });
    let substring = substring.expect("substring call on the left");
    assert_eq!(substring.operator().keyword(), "substring");
    assert_eq!(substring.operands().count(), 3);

    let values: Vec<Value> = criteria.all_parameters().map(|p| p.value.clone()).collect();
    assert_eq!(values, vec![Value::Int(1), Value::Int(3), Value::from("Jim")]);
}

#[test]
fn unknown_token_is_not_a_literal() {
    let error = compile_err("foo eq 1");
    match error {
        ParseError::UnresolvedOperand { token, operator, position, .. } => {
            assert_eq!(token, "foo");
            assert_eq!(operator, "eq");
            assert_eq!(position.to_string(), "left");
        }
        other => panic!("expected unresolved operand, got {other:?}"),
    }
}

#[test]
fn blank_filter_is_empty() {
    for case in ["", " ", "\t\r\n", "()"] {
        let criteria = compile(case);
        assert!(criteria.is_empty(), "{case:?}");
        assert_eq!(criteria.render(Syntax::Sql), "()", "{case:?}");
        assert_eq!(criteria.all_parameters().count(), 0, "{case:?}");
    }
}

#[test]
fn numeric_literals_are_typed() {
    let cases = vec![
        ("a eq 3", Value::Int(3)),
        ("a eq -3", Value::Int(-3)),
        ("a eq 4294967296", Value::Long(4294967296)),
        ("a eq 1e3", Value::Float(1000.0)),
    ];
    for (case, expected) in cases {
        let criteria = compile(case);
        let value = criteria.all_parameters().next().map(|p| p.value.clone());
        assert_eq!(value, Some(expected), "{case:?}");
    }

    let criteria = compile("a eq 3.14");
    let value = criteria.all_parameters().next().map(|p| p.value.type_name());
    assert_eq!(value, Some("decimal"));
}

#[test]
fn deep_nesting_fails_with_structural_error() {
    let nested = |depth: usize| format!("{}a eq 1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(sql(&nested(64)), "[a] = @Filter0");

    for depth in [65, 5000] {
        let error = compile_err(&nested(depth));
        assert_eq!(error.kind(), "Structural error", "depth {depth}: {error}");
    }
}

#[test]
fn conjunction_in_function_arguments_is_rejected() {
    for case in [
        "contains(Name, a eq 1 or b eq 2)",
        "a eq 1 and contains(Name, b eq 2 or c eq 3)",
        "(contains(Name, b eq 2 and c eq 3)) or a eq 1",
    ] {
        let error = compile_err(case);
        assert_eq!(error.kind(), "Structural error", "{case:?}: {error}");
        assert!(error.to_string().contains("not allowed in function arguments"), "{case:?}: {error}");
    }
}

#[test]
fn exists_round_trips_without_extra_parentheses() {
    let first = compile("ex (b)").render(Syntax::Filter);
    assert_eq!(first, "ex (b)");
    assert_eq!(compile(&first).render(Syntax::Filter), first);
    assert_eq!(sql("ex (a eq 1)"), "EXISTS ([a] = @Filter0)");
}
