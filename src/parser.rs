//! Compiles filter text into [`Criteria`].
//!
//! Compilation runs in three steps:
//!
//! 1. The filter is tokenized and sorted into a provisional [`SyntaxTree`] of groups,
//!    function calls and `and`/`or` markers.
//! 2. Groups with conjunctions become `And`/`Or` criteria, one child per run of nodes
//!    between the markers.
//! 3. Every other run is flattened into fragments (operators, fields, parameters, nested
//!    expressions) and handed to the [`OperatorBuilder`].
//!
//! Examples: `status eq InTransit`, `(status eq Placed or status eq Delivered) and
//! substring(CustomerName,1,3) eq 'Jim'`, `not (a eq 1 or b eq 2)`

use crate::builder::OperatorBuilder;
use crate::criteria::Criteria;
use crate::error::{ParseError, Result};
use crate::expr::{Expression, Render, Syntax};
use crate::fragment::SqlFragment;
use crate::operator::registry;
use crate::parameter::{Counter, Parameter, Value, unquote};
use crate::resolver::{FilterField, Resolver};
use crate::scanner::{Token, Tokenizer, TokenizerOptions};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::token_type::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub tokenizer: TokenizerOptions,
    /// Parameters are named `{prefix}{n}`, counting from 0 in each compile call.
    pub parameter_prefix: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            tokenizer: TokenizerOptions::filter_syntax(),
            parameter_prefix: "Filter".to_string(),
        }
    }
}

/// Compiles `filter`, resolving words through the two lookups.
pub fn parse<F, C>(filter: &str, resolve_field: F, resolve_constant: C) -> Result<Criteria>
where
    F: Fn(&str) -> Option<FilterField>,
    C: Fn(&str) -> Option<Value>,
{
    parse_with(filter, &(resolve_field, resolve_constant))
}

/// Like [`parse`], but gives `None` instead of an error. Callers typically fall back to
/// treating the filter as raw text.
pub fn try_parse<F, C>(filter: &str, resolve_field: F, resolve_constant: C) -> Option<Criteria>
where
    F: Fn(&str) -> Option<FilterField>,
    C: Fn(&str) -> Option<Value>,
{
    match parse(filter, resolve_field, resolve_constant) {
        Ok(criteria) => Some(criteria),
        Err(error) => {
            tracing::debug!(filter, %error, "filter did not compile");
            None
        }
    }
}

pub fn parse_with<R: Resolver + ?Sized>(filter: &str, resolver: &R) -> Result<Criteria> {
    Parser::new(resolver).parse(filter)
}

/// A reusable compiler bound to one resolver. Each [`Parser::parse`] call numbers its
/// parameters from zero.
pub struct Parser<'r, R: Resolver + ?Sized> {
    resolver: &'r R,
    options: ParseOptions,
}

impl<'r, R: Resolver + ?Sized> Parser<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Parser::with_options(resolver, ParseOptions::default())
    }

    pub fn with_options(resolver: &'r R, options: ParseOptions) -> Self {
        Parser { resolver, options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, filter: &str) -> Result<Criteria> {
        let tokens = Tokenizer::new(filter, self.options.tokenizer.clone()).read_all()?;
        tracing::trace!(count = tokens.len(), "tokenized filter");

        let tree = SyntaxTree::build(&tokens)?;
        tracing::trace!(tree = %tree.to_xml(), "syntax tree");

        let mut compilation = Compilation {
            resolver: self.resolver,
            prefix: &self.options.parameter_prefix,
            counter: Counter::new(),
        };
        let criteria = compilation.compile(&tree, tree.root())?;
        tracing::debug!(filter, sql = %criteria.render(Syntax::Sql), "compiled filter");
        Ok(criteria)
    }
}

/// State of one compile call.
struct Compilation<'a, R: Resolver + ?Sized> {
    resolver: &'a R,
    prefix: &'a str,
    counter: Counter,
}

impl<R: Resolver + ?Sized> Compilation<'_, R> {
    fn compile(&mut self, tree: &SyntaxTree, id: NodeId) -> Result<Criteria> {
        let id = tree.elide(id);
        if tree.is_empty(id) {
            return Ok(Criteria::Empty);
        }

        if tree.kind(id) == NodeKind::Group {
            // Redundant parentheses: `((a eq 1))`
            if let [only] = tree.children(id) {
                let inner = tree.elide(*only);
                if matches!(tree.kind(inner), NodeKind::Group | NodeKind::BinaryGroup) {
                    return self.compile(tree, inner);
                }
            }
        }

        let dominant = tree.dominant(id);
        // A conjunction among function arguments is rejected by `flatten`.
        let binary =
            tree.kind(dominant) != NodeKind::Function && tree.has_binary_children(dominant);
        if tree.kind(id) == NodeKind::BinaryGroup || binary {
            return self.compile_binary(tree, dominant);
        }

        let expression = match tree.kind(id) {
            NodeKind::Group => self.to_expression(tree, tree.children(id))?,
            _ => self.to_expression(tree, &[id])?,
        };
        if !expression.has_operator() {
            let token = first_token(tree, id);
            return Err(ParseError::MissingOperator {
                token: token.map(|t| t.text.clone()),
                location: token.map(Token::location),
            });
        }
        Ok(Criteria::Expression(expression))
    }

    /// Splits the children of `scope` on its `and`/`or` markers.
    fn compile_binary(&mut self, tree: &SyntaxTree, scope: NodeId) -> Result<Criteria> {
        let mut markers: Vec<&Token> = Vec::new();
        let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];

        for child in tree.children(scope) {
            if tree.kind(*child) == NodeKind::Binary {
                if let Some(token) = tree.tokens(*child).first() {
                    markers.push(token);
                }
                runs.push(Vec::new());
            } else if let Some(run) = runs.last_mut() {
                run.push(*child);
            }
        }

        let keyword = conjunction(&markers);
        let mut children = Vec::with_capacity(runs.len());
        for (index, run) in runs.iter().enumerate() {
            let criteria = match run.as_slice() {
                [] => {
                    let marker = markers.get(index).or(markers.last());
                    return Err(match marker {
                        Some(token) => ParseError::structural_at(
                            format!("missing condition next to '{}'", token.text),
                            &token.text,
                            token.location(),
                        ),
                        None => ParseError::structural("missing condition"),
                    });
                }
                [single] => self.compile(tree, *single)?,
                nodes => self.to_expression(tree, nodes)?.into_criteria(),
            };
            children.push(criteria);
        }

        Ok(match keyword {
            "or" => Criteria::or(children),
            _ => Criteria::and(children),
        })
    }

    fn to_expression(&mut self, tree: &SyntaxTree, nodes: &[NodeId]) -> Result<Expression> {
        let mut fragments = Vec::new();
        for node in nodes {
            self.flatten(tree, *node, &mut fragments)?;
        }
        OperatorBuilder::new(fragments).build()
    }

    fn flatten(&mut self, tree: &SyntaxTree, id: NodeId, out: &mut Vec<SqlFragment>) -> Result<()> {
        match tree.kind(id) {
            NodeKind::Group => {
                let inner = self.to_expression(tree, tree.children(id))?;
                out.push(SqlFragment::Expression(Expression::group(inner)));
            }
            NodeKind::BinaryGroup => {
                let criteria = self.compile(tree, id)?;
                out.push(SqlFragment::Expression(Expression::Nested(Box::new(criteria))));
            }
            NodeKind::Binary => {
                return Err(match tree.tokens(id).first() {
                    Some(token) => ParseError::structural_at(
                        format!("'{}' is not allowed in function arguments", token.text),
                        &token.text,
                        token.location(),
                    ),
                    None => ParseError::structural("conjunction is not allowed here"),
                });
            }
            NodeKind::Unknown | NodeKind::Function => {
                for token in tree.tokens(id) {
                    out.push(self.to_fragment(token));
                }
                for child in tree.children(id) {
                    if tree.kind(*child) == NodeKind::Function {
                        let call = self.to_expression(tree, &[*child])?;
                        out.push(SqlFragment::Expression(call));
                    } else {
                        self.flatten(tree, *child, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn to_fragment(&mut self, token: &Token) -> SqlFragment {
        if token.kind == TokenKind::Word {
            if let Some(operator) = registry().lookup(&token.text) {
                return SqlFragment::Operator(operator);
            }
        }
        if token.is_symbol(",") {
            return SqlFragment::Comma;
        }
        if token.kind == TokenKind::QuotedString {
            if let Some(text) = unquote(&token.text) {
                return self.parameter(Value::String(text));
            }
        }
        if let Some(number) = Value::parse_number(&token.text) {
            return self.parameter(number);
        }
        if let Some(field) = self.resolver.resolve_field(&token.text) {
            return SqlFragment::Identifier(field.identifier);
        }
        if let Some(value) = self.resolver.resolve_constant(&token.text) {
            return self.parameter(value);
        }
        if let Some(value) = Value::parse_keyword(&token.text) {
            return self.parameter(value);
        }
        SqlFragment::Unparsed(token.clone())
    }

    fn parameter(&mut self, value: Value) -> SqlFragment {
        let name = format!("{}{}", self.prefix, self.counter.next());
        SqlFragment::Parameter(Parameter::new(name, value))
    }
}

/// The first marker decides. A differing keyword in the same group is reported and
/// otherwise ignored.
fn conjunction(markers: &[&Token]) -> &'static str {
    let mut keywords = markers.iter().filter_map(|token| token.conjunction());
    let first = keywords.next().unwrap_or("and");
    if let Some(other) = keywords.find(|keyword| *keyword != first) {
        tracing::warn!(
            applied = first,
            ignored = other,
            "mixed 'and'/'or' in one group, all conditions are joined with '{}'",
            first
        );
    }
    first
}

fn first_token(tree: &SyntaxTree, id: NodeId) -> Option<&Token> {
    tree.tokens(id)
        .first()
        .or_else(|| tree.children(id).iter().find_map(|child| first_token(tree, *child)))
}
