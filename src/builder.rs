use crate::error::{ParseError, Result};
use crate::expr::{Expression, Render, Syntax};
use crate::fragment::SqlFragment;
use crate::operator::Operator;

/// Operand slot of an operator application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Position {
    Left,
    Right,
    Right1,
}

/// Turns one run of fragments into an operator application.
///
/// The first operator in the run decides the shape. A function takes its operands from
/// the comma-separated arguments after its name; anything else is infix, with the
/// fragments before it on the left and the ones after it on the right. Further operators
/// on the right either become the right operand (`a eq not b`) or chain onto the result
/// (`a add b eq c`).
pub struct OperatorBuilder {
    fragments: Vec<SqlFragment>,
}

impl OperatorBuilder {
    pub fn new(fragments: Vec<SqlFragment>) -> Self {
        OperatorBuilder { fragments }
    }

    pub fn build(self) -> Result<Expression> {
        build(self.fragments)
    }
}

fn build(fragments: Vec<SqlFragment>) -> Result<Expression> {
    let first = fragments
        .iter()
        .enumerate()
        .find_map(|(index, fragment)| fragment.as_operator().map(|op| (index, op)));

    match first {
        Some((index, operator)) if operator.is_function() => function(operator, fragments, index),
        Some((index, operator)) => infix(operator, fragments, index),
        None => pass_through(fragments),
    }
}

/// A run without an operator is only usable when it is a single operand.
fn pass_through(mut fragments: Vec<SqlFragment>) -> Result<Expression> {
    match fragments.as_slice() {
        [SqlFragment::Expression(_)] => match fragments.pop() {
            Some(SqlFragment::Expression(expression)) => Ok(expression),
            _ => Err(missing_operator(&fragments)),
        },
        [SqlFragment::Parameter(_) | SqlFragment::Identifier(_)] => {
            Ok(Expression::Fragments(fragments))
        }
        _ => Err(missing_operator(&fragments)),
    }
}

fn missing_operator(fragments: &[SqlFragment]) -> ParseError {
    let unparsed = fragments.iter().find_map(|fragment| match fragment {
        SqlFragment::Unparsed(token) => Some(token),
        _ => None,
    });

    match (unparsed, fragments.first()) {
        (Some(token), _) => ParseError::MissingOperator {
            token: Some(token.text.clone()),
            location: Some(token.location()),
        },
        (None, first) => ParseError::MissingOperator {
            token: first.map(|fragment| fragment.render(Syntax::Filter)),
            location: None,
        },
    }
}

fn function(
    operator: &'static Operator,
    fragments: Vec<SqlFragment>,
    index: usize,
) -> Result<Expression> {
    if let Some(stray) = fragments.iter().take(index).next() {
        return Err(structural(
            format!("unexpected {} before function '{}'", stray.describe(), operator.keyword()),
            stray,
        ));
    }

    let arguments = split_arguments(fragments.into_iter().skip(index + 1).collect());
    if arguments.len() > 1 && arguments.iter().any(|argument| argument.is_empty()) {
        return Err(ParseError::structural(format!(
            "empty argument in call to '{}'",
            operator.keyword()
        )));
    }
    if arguments.len() > 3 {
        return Err(ParseError::structural(format!(
            "too many arguments in call to '{}'",
            operator.keyword()
        )));
    }

    let mut operands = [None, None, None];
    let positions = [Position::Left, Position::Right, Position::Right1];
    for ((argument, position), slot) in arguments.into_iter().zip(positions).zip(&mut operands) {
        *slot = operand(operator, position, argument)?;
    }

    let [left, right, right1] = operands;
    apply(operator, left, right, right1)
}

/// Splits on top-level commas. No arguments at all gives an empty list.
fn split_arguments(fragments: Vec<SqlFragment>) -> Vec<Vec<SqlFragment>> {
    if fragments.is_empty() {
        return Vec::new();
    }

    let mut arguments = vec![Vec::new()];
    for fragment in fragments {
        match fragment {
            SqlFragment::Comma => arguments.push(Vec::new()),
            other => {
                if let Some(current) = arguments.last_mut() {
                    current.push(other);
                }
            }
        }
    }
    arguments
}

fn infix(operator: &'static Operator, fragments: Vec<SqlFragment>, index: usize) -> Result<Expression> {
    let mut rest = fragments.into_iter();
    let left_fragments: Vec<SqlFragment> = rest.by_ref().take(index).collect();
    rest.next(); // the operator itself
    let left = operand(operator, Position::Left, left_fragments)?;

    let mut right = Vec::new();
    while let Some(fragment) = rest.next() {
        match fragment {
            SqlFragment::Operator(next) if right.is_empty() => {
                let mut nested = vec![SqlFragment::Operator(next)];
                nested.extend(rest);
                let right = build(nested)?;
                return apply(operator, left, Some(right), None);
            }
            SqlFragment::Operator(next) => {
                let right = operand(operator, Position::Right, right)?;
                let current = apply(operator, left, right, None)?;
                let mut chained = vec![SqlFragment::Expression(current), SqlFragment::Operator(next)];
                chained.extend(rest);
                return build(chained);
            }
            SqlFragment::Comma => {
                return Err(ParseError::structural(format!(
                    "unexpected ',' after operator '{}'",
                    operator.keyword()
                )));
            }
            other => right.push(other),
        }
    }

    let right = operand(operator, Position::Right, right)?;
    apply(operator, left, right, None)
}

/// Resolves the fragments of one operand slot. A slot holding an operator is an
/// application of its own.
fn operand(
    operator: &'static Operator,
    position: Position,
    fragments: Vec<SqlFragment>,
) -> Result<Option<Expression>> {
    if fragments.iter().any(|fragment| fragment.as_operator().is_some()) {
        return build(fragments).map(Some);
    }

    for fragment in &fragments {
        if let SqlFragment::Unparsed(token) = fragment {
            return Err(ParseError::UnresolvedOperand {
                token: token.text.clone(),
                operator: operator.keyword().to_string(),
                position,
                location: token.location(),
            });
        }
    }

    Ok(Expression::operand(fragments))
}

/// Builds the application after checking the operands against the operator's template.
fn apply(
    operator: &'static Operator,
    left: Option<Expression>,
    right: Option<Expression>,
    right1: Option<Expression>,
) -> Result<Expression> {
    let template = operator.template(Syntax::Filter, right1.is_some());
    let slots = [
        (Position::Left, "{lhs}", left.is_some()),
        (Position::Right, "{rhs}", right.is_some()),
        (Position::Right1, "{rhs1}", right1.is_some()),
    ];

    for (position, slot, present) in slots {
        let expected = template.contains(slot);
        if expected && !present {
            return Err(ParseError::structural(format!(
                "operator '{}' is missing its {} operand",
                operator.keyword(),
                position
            )));
        }
        if present && !expected {
            return Err(ParseError::structural(format!(
                "operator '{}' does not take a {} operand",
                operator.keyword(),
                position
            )));
        }
    }

    let left = left.map(|expression| strip_group(template, "{lhs}", expression));
    let right = right.map(|expression| strip_group(template, "{rhs}", expression));
    let right1 = right1.map(|expression| strip_group(template, "{rhs1}", expression));
    Ok(Expression::apply(operator, left, right, right1))
}

/// Drops the parentheses around a lone grouped operand when the template already
/// encloses its slot, so `ex (b)` stays `ex (b)` when rendered.
fn strip_group(template: &str, slot: &str, mut expression: Expression) -> Expression {
    if !template.contains(&format!("({})", slot)) {
        return expression;
    }
    if let Expression::Fragments(fragments) = &mut expression {
        if let [SqlFragment::Expression(Expression::Group(_))] = fragments.as_slice() {
            if let Some(SqlFragment::Expression(grouped)) = fragments.pop() {
                expression = grouped;
            }
        }
    }
    match expression {
        Expression::Group(_) => expression.ungrouped().clone(),
        other => other,
    }
}

fn structural(message: String, fragment: &SqlFragment) -> ParseError {
    match fragment {
        SqlFragment::Unparsed(token) => ParseError::structural_at(message, &token.text, token.location()),
        _ => ParseError::structural(message),
    }
}
