use std::collections::HashSet;
use std::fmt;

use crate::expr::{Expression, Render, Syntax};
use crate::operator::{AND, NEW_LINE, OR, Operator};
use crate::parameter::Parameter;

/// The compiled predicate tree.
///
/// `And`/`Or` hold further criteria, never raw tokens. An `And`/`Or` without children
/// counts as empty, the same as [`Criteria::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Criteria {
    #[default]
    Empty,
    Expression(Expression),
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
}

impl Criteria {
    /// Conjunction of the non-empty `children`.
    pub fn and(children: impl IntoIterator<Item = Criteria>) -> Self {
        Criteria::And(non_empty(children))
    }

    /// Disjunction of the non-empty `children`.
    pub fn or(children: impl IntoIterator<Item = Criteria>) -> Self {
        Criteria::Or(non_empty(children))
    }

    pub fn from_expression(expression: Expression) -> Self {
        expression.into_criteria()
    }

    /// Adds `child` to this criteria. A leaf turns into an `And` of itself and the child;
    /// an empty criteria is replaced by the child.
    pub fn push(&mut self, child: Criteria) {
        if child.is_empty() {
            return;
        }
        match self {
            Criteria::And(children) | Criteria::Or(children) => children.push(child),
            Criteria::Empty => *self = child,
            Criteria::Expression(_) => {
                let leaf = std::mem::take(self);
                *self = Criteria::And(vec![leaf, child]);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Criteria::Empty => true,
            Criteria::Expression(_) => false,
            Criteria::And(children) | Criteria::Or(children) => children.is_empty(),
        }
    }

    pub fn expression(&self) -> Option<&Expression> {
        match self {
            Criteria::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Criteria] {
        match self {
            Criteria::And(children) | Criteria::Or(children) => children,
            _ => &[],
        }
    }

    fn conjunction(&self) -> Option<&'static Operator> {
        match self {
            Criteria::And(_) => Some(&AND),
            Criteria::Or(_) => Some(&OR),
            _ => None,
        }
    }

    /// Every parameter in rendering order, duplicates included.
    pub fn all_parameters(&self) -> Box<dyn Iterator<Item = &Parameter> + '_> {
        match self {
            Criteria::Empty => Box::new(std::iter::empty()),
            Criteria::Expression(expression) => expression.parameters(),
            Criteria::And(children) | Criteria::Or(children) => {
                Box::new(children.iter().flat_map(|child| child.all_parameters()))
            }
        }
    }

    /// Parameters with unique names; the first occurrence of a name wins.
    pub fn distinct_parameters(&self) -> Vec<&Parameter> {
        let mut seen = HashSet::new();
        self.all_parameters()
            .filter(|parameter| seen.insert(parameter.name.as_str()))
            .collect()
    }
}

fn non_empty(children: impl IntoIterator<Item = Criteria>) -> Vec<Criteria> {
    children.into_iter().filter(|child| !child.is_empty()).collect()
}

impl Render for Criteria {
    fn render(&self, syntax: Syntax) -> String {
        match (self, self.conjunction()) {
            (Criteria::Expression(expression), _) => expression.render(syntax),
            (Criteria::And(children) | Criteria::Or(children), Some(conjunction))
                if !children.is_empty() =>
            {
                let separator = format!(
                    "{} {} ",
                    NEW_LINE.spelling(syntax),
                    conjunction.spelling(syntax)
                );
                let parts: Vec<String> = children.iter().map(|c| c.render(syntax)).collect();
                format!("({})", parts.join(&separator))
            }
            _ => "()".to_string(),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(Syntax::Sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Identifier, SqlFragment};
    use crate::operator::registry;

    fn eq(field: &str, parameter: &str, value: i32) -> Criteria {
        Criteria::Expression(Expression::apply(
            registry().lookup("eq").unwrap(),
            Expression::operand(vec![SqlFragment::Identifier(Identifier::new(field))]),
            Expression::operand(vec![SqlFragment::Parameter(Parameter::new(parameter, value))]),
            None,
        ))
    }

    #[test]
    fn test_empty_renders_as_parentheses() {
        let cases = vec![Criteria::Empty, Criteria::And(vec![]), Criteria::or(vec![Criteria::Empty])];
        for case in cases {
            assert!(case.is_empty(), "Expected empty: {:?}", case);
            assert_eq!(case.render(Syntax::Sql), "()", "{:?}", case);
            assert_eq!(case.all_parameters().count(), 0, "{:?}", case);
        }
    }

    #[test]
    fn test_separators_per_syntax() {
        let criteria = Criteria::and(vec![
            eq("a", "Filter0", 1),
            Criteria::or(vec![eq("b", "Filter1", 2), eq("c", "Filter2", 3)]),
        ]);
        assert_eq!(
            criteria.render(Syntax::Sql),
            "([a] = @Filter0\r\n AND ([b] = @Filter1\r\n OR [c] = @Filter2))"
        );
        assert_eq!(
            criteria.render(Syntax::Filter),
            "(a eq @Filter0 and (b eq @Filter1 or c eq @Filter2))"
        );
        assert_eq!(
            criteria.render(Syntax::Placeholder),
            "([a] = ?\r\n AND ([b] = ?\r\n OR [c] = ?))"
        );
    }

    #[test]
    fn test_push() {
        let mut criteria = Criteria::Empty;
        criteria.push(Criteria::Empty);
        assert!(criteria.is_empty());

        criteria.push(eq("a", "Filter0", 1));
        assert!(criteria.expression().is_some());

        criteria.push(eq("b", "Filter1", 2));
        assert!(matches!(criteria, Criteria::And(_)));
        assert_eq!(criteria.children().len(), 2);

        let mut or = Criteria::or(vec![eq("a", "Filter0", 1)]);
        or.push(eq("b", "Filter1", 2));
        assert_eq!(or.children().len(), 2);
    }

    #[test]
    fn test_distinct_parameters_keep_first() {
        let criteria = Criteria::and(vec![
            eq("a", "Filter0", 1),
            eq("b", "Filter1", 2),
            eq("c", "Filter0", 9),
        ]);
        let all: Vec<_> = criteria.all_parameters().map(|p| p.name.as_str()).collect();
        assert_eq!(all, vec!["Filter0", "Filter1", "Filter0"]);

        let distinct = criteria.distinct_parameters();
        assert_eq!(distinct.len(), 2);
        assert_eq!(distinct[0].value, crate::parameter::Value::Int(1));
        assert_eq!(distinct[1].name, "Filter1");
    }

    #[test]
    fn test_from_expression_unwraps_nested() {
        let inner = Criteria::or(vec![eq("a", "Filter0", 1), eq("b", "Filter1", 2)]);
        let criteria = Criteria::from_expression(Expression::Nested(Box::new(inner.clone())));
        assert_eq!(criteria, inner);
    }
}
