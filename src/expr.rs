use std::fmt;

use crate::criteria::Criteria;
use crate::fragment::SqlFragment;
use crate::operator::Operator;
use crate::parameter::Parameter;

/// Target text of a rendering.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Syntax {
    /// SQL with named `@FilterN` parameters.
    #[default]
    Sql,
    /// The filter syntax the text was written in.
    Filter,
    /// SQL with positional `?` parameters.
    Placeholder,
}

/// Anything that can be written out as filter text or SQL.
pub trait Render {
    fn render(&self, syntax: Syntax) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Apply(OperatorExpression),
    /// Parenthesized sub-expression.
    Group(Box<Expression>),
    /// An operand made of one or more fragments, rendered back to back.
    Fragments(Vec<SqlFragment>),
    /// A boolean group used where an operand is expected, as in `not (a eq 1 or b eq 2)`.
    Nested(Box<Criteria>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorExpression {
    operator: &'static Operator,
    left: Option<Box<Expression>>,
    right: Option<Box<Expression>>,
    right1: Option<Box<Expression>>,
}

impl OperatorExpression {
    pub fn operator(&self) -> &'static Operator {
        self.operator
    }

    pub fn left(&self) -> Option<&Expression> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Expression> {
        self.right.as_deref()
    }

    pub fn right1(&self) -> Option<&Expression> {
        self.right1.as_deref()
    }

    /// Present operands in rendering order.
    pub fn operands(&self) -> impl Iterator<Item = &Expression> {
        [&self.left, &self.right, &self.right1]
            .into_iter()
            .flatten()
            .map(|operand| operand.as_ref())
    }
}

impl Expression {
    pub fn apply(
        operator: &'static Operator,
        left: Option<Expression>,
        right: Option<Expression>,
        right1: Option<Expression>,
    ) -> Self {
        Expression::Apply(OperatorExpression {
            operator,
            left: left.map(Box::new),
            right: right.map(Box::new),
            right1: right1.map(Box::new),
        })
    }

    pub fn group(inner: Expression) -> Self {
        Expression::Group(Box::new(inner))
    }

    /// An operand built from fragments; `None` when there are none.
    pub fn operand(fragments: Vec<SqlFragment>) -> Option<Self> {
        if fragments.is_empty() {
            None
        } else {
            Some(Expression::Fragments(fragments))
        }
    }

    pub fn as_apply(&self) -> Option<&OperatorExpression> {
        match self {
            Expression::Apply(apply) => Some(apply),
            _ => None,
        }
    }

    /// The expression with any enclosing parentheses removed.
    pub fn ungrouped(&self) -> &Expression {
        match self {
            Expression::Group(inner) => inner.ungrouped(),
            other => other,
        }
    }

    /// True when an operator application appears anywhere inside.
    pub fn has_operator(&self) -> bool {
        match self {
            Expression::Apply(_) | Expression::Nested(_) => true,
            Expression::Group(inner) => inner.has_operator(),
            Expression::Fragments(fragments) => fragments.iter().any(|fragment| {
                matches!(fragment, SqlFragment::Expression(expression) if expression.has_operator())
            }),
        }
    }

    /// Parameters reachable from this expression, depth-first in rendering order.
    pub fn parameters(&self) -> Box<dyn Iterator<Item = &Parameter> + '_> {
        match self {
            Expression::Apply(apply) => Box::new(apply.operands().flat_map(|e| e.parameters())),
            Expression::Group(inner) => inner.parameters(),
            Expression::Fragments(fragments) => Box::new(fragments.iter().flat_map(
                |fragment| -> Box<dyn Iterator<Item = &Parameter> + '_> {
                    match fragment {
                        SqlFragment::Parameter(parameter) => Box::new(std::iter::once(parameter)),
                        SqlFragment::Expression(expression) => expression.parameters(),
                        _ => Box::new(std::iter::empty()),
                    }
                },
            )),
            Expression::Nested(criteria) => criteria.all_parameters(),
        }
    }

    /// Wraps the expression as a leaf criteria. Parentheses are dropped, a nested boolean
    /// group becomes the criteria it holds.
    pub fn into_criteria(self) -> Criteria {
        match self {
            Expression::Group(inner) => inner.into_criteria(),
            Expression::Nested(criteria) => *criteria,
            other => Criteria::Expression(other),
        }
    }
}

impl Render for Expression {
    fn render(&self, syntax: Syntax) -> String {
        match self {
            Expression::Apply(apply) => apply.render(syntax),
            Expression::Group(inner) => format!("({})", inner.render(syntax)),
            Expression::Fragments(fragments) => fragments
                .iter()
                .map(|fragment| fragment.render(syntax))
                .collect(),
            Expression::Nested(criteria) => criteria.render(syntax),
        }
    }
}

impl Render for OperatorExpression {
    fn render(&self, syntax: Syntax) -> String {
        let operand = |slot: &Option<Box<Expression>>| {
            slot.as_ref()
                .map(|expression| expression.render(syntax))
                .unwrap_or_default()
        };

        let template = self.operator.template(syntax, self.right1.is_some());
        substitute(template, |slot| match slot {
            "op" => Some(self.operator.spelling(syntax).to_string()),
            "lhs" => Some(operand(&self.left)),
            "rhs" => Some(operand(&self.right)),
            "rhs1" => Some(operand(&self.right1)),
            _ => None,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(Syntax::Sql))
    }
}

/// Replaces `{slot}` markers in one pass, so substituted text is never rescanned.
/// Unknown markers are copied through.
fn substitute(template: &str, mut value: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let replaced = tail
            .find('}')
            .map(|end| &tail[1..end])
            .and_then(|slot| value(slot).map(|text| (slot.len(), text)));

        match replaced {
            Some((len, text)) => {
                out.push_str(&text);
                rest = &tail[len + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
