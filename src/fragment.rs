use std::fmt;

use crate::expr::{Expression, Render, Syntax};
use crate::operator::Operator;
use crate::parameter::Parameter;
use crate::scanner::Token;

/// A resolved column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub qualifier: Option<String>,
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Identifier {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Splits `Order.Status` into qualifier and name at the last dot.
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((qualifier, name)) if !qualifier.is_empty() && !name.is_empty() => {
                Identifier::qualified(qualifier, name)
            }
            _ => Identifier::new(text),
        }
    }

    pub fn dotted(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, self.name),
            None => self.name.clone(),
        }
    }
}

impl Render for Identifier {
    /// `[Order].[Status]` in SQL, `Order.Status` in filter syntax.
    fn render(&self, syntax: Syntax) -> String {
        match syntax {
            Syntax::Filter => self.dotted(),
            Syntax::Sql | Syntax::Placeholder => match &self.qualifier {
                Some(qualifier) => format!("{}.{}", bracket(qualifier), bracket(&self.name)),
                None => bracket(&self.name),
            },
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// Wraps each dot-separated part in square brackets; `*` stays bare.
fn bracket(name: &str) -> String {
    if name == "*" {
        return name.to_string();
    }
    name.split('.')
        .filter(|part| !part.is_empty())
        .map(|part| format!("[{}]", part.trim_matches(['[', ']'])))
        .collect::<Vec<_>>()
        .join(".")
}

/// The pieces an expression is assembled from.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlFragment {
    Operator(&'static Operator),
    Parameter(Parameter),
    Identifier(Identifier),
    Comma,
    /// A token nothing could resolve yet. Fatal once it has to serve as an operand.
    Unparsed(Token),
    Expression(Expression),
}

impl Render for SqlFragment {
    fn render(&self, syntax: Syntax) -> String {
        match self {
            SqlFragment::Operator(operator) => operator.spelling(syntax).to_string(),
            SqlFragment::Parameter(parameter) => parameter.render(syntax),
            SqlFragment::Identifier(identifier) => identifier.render(syntax),
            SqlFragment::Comma => ",".to_string(),
            SqlFragment::Unparsed(token) => token.text.clone(),
            SqlFragment::Expression(expression) => expression.render(syntax),
        }
    }
}

impl SqlFragment {
    pub fn as_operator(&self) -> Option<&'static Operator> {
        match self {
            SqlFragment::Operator(operator) => Some(operator),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            SqlFragment::Operator(operator) => format!("operator '{}'", operator.keyword()),
            SqlFragment::Parameter(parameter) => format!("value {}", parameter.value.to_sql_literal()),
            SqlFragment::Identifier(identifier) => format!("field '{}'", identifier),
            SqlFragment::Comma => "','".to_string(),
            SqlFragment::Unparsed(token) => format!("'{}'", token.text),
            SqlFragment::Expression(expression) => format!("'{}'", expression.render(Syntax::Filter)),
        }
    }
}
