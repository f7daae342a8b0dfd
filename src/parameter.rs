use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

use crate::expr::{Render, Syntax};

/// A typed literal bound to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Decimal(BigDecimal),
    Float(f32),
    String(String),
}

impl Value {
    /// Reads a numeric literal. Tries 32-bit integer, then 64-bit integer, then decimal,
    /// then floating point; the first that fits decides the type.
    pub fn parse_number(text: &str) -> Option<Value> {
        if let Ok(value) = text.parse::<i32>() {
            return Some(Value::Int(value));
        }
        if let Ok(value) = text.parse::<i64>() {
            return Some(Value::Long(value));
        }
        if is_plain_decimal(text) {
            if let Ok(value) = BigDecimal::from_str(text) {
                return Some(Value::Decimal(value));
            }
        }
        if starts_like_number(text) {
            if let Ok(value) = text.parse::<f32>() {
                if value.is_finite() {
                    return Some(Value::Float(value));
                }
            }
        }
        None
    }

    /// Reads a literal the way the filter syntax writes it: quoted string, number,
    /// `true`/`false`/`null`, anything else as a bare string.
    pub fn parse_literal(text: &str) -> Value {
        if let Some(inner) = unquote(text) {
            return Value::String(inner);
        }
        if let Some(number) = Value::parse_number(text) {
            return number;
        }
        if let Some(keyword) = Value::parse_keyword(text) {
            return keyword;
        }
        Value::String(text.to_string())
    }

    /// `true`, `false` and `null` in any letter case.
    pub fn parse_keyword(text: &str) -> Option<Value> {
        if text.eq_ignore_ascii_case("true") {
            Some(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Some(Value::Bool(false))
        } else if text.eq_ignore_ascii_case("null") {
            Some(Value::Null)
        } else {
            None
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    /// Inline SQL spelling of the value, for diagnostics and for callers that cannot bind.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        }
    }
}

/// `^[+-]?digits[.digits]$`, with digits on at least one side of the point.
fn is_plain_decimal(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut parts = body.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("");
    (!whole.is_empty() || !fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

fn starts_like_number(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    body.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
}

/// Strips the surrounding quotes and collapses doubled quotes.
pub fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Parameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Render for Parameter {
    fn render(&self, syntax: Syntax) -> String {
        match syntax {
            Syntax::Placeholder => "?".to_string(),
            Syntax::Sql | Syntax::Filter => format!("@{}", self.name),
        }
    }
}

/// Hands out parameter numbers for one compile call.
#[derive(Debug, Default)]
pub struct Counter {
    next: usize,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }

    pub fn next(&mut self) -> usize {
        let current = self.next;
        self.next += 1;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_precedence() {
        let cases = vec![
            ("3", "int"),
            ("-1", "int"),
            ("2147483648", "long"),
            ("-9223372036854775808", "long"),
            ("3.14", "decimal"),
            (".5", "decimal"),
            ("-0.25", "decimal"),
            ("99999999999999999999", "decimal"),
            ("1e5", "float"),
            ("2.5E-3", "float"),
        ];
        for (case, expected) in cases {
            let value = Value::parse_number(case);
            assert!(value.is_some(), "Failed to parse number {:?}", case);
            assert_eq!(value.unwrap().type_name(), expected, "Wrong type for {:?}", case);
        }
    }

    #[test]
    fn test_not_numbers() {
        for case in ["abc", "1a", "inf", "NaN", "infinity", "-", ".", "1.2.3", ""] {
            assert!(Value::parse_number(case).is_none(), "Parsed non-number {:?}", case);
        }
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse_literal("'O''Brien'"), Value::String("O'Brien".to_string()));
        assert_eq!(Value::parse_literal("42"), Value::Int(42));
        assert_eq!(Value::parse_literal("TRUE"), Value::Bool(true));
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("Placed"), Value::String("Placed".to_string()));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Bool(true).to_sql_literal(), "1");
        assert_eq!(Value::Bool(false).to_sql_literal(), "0");
        assert_eq!(Value::from("it's").to_sql_literal(), "'it''s'");
        assert_eq!(Value::Int(7).to_sql_literal(), "7");
    }

    #[test]
    fn test_parameter_rendering() {
        let parameter = Parameter::new("Filter0", 1);
        assert_eq!(parameter.render(Syntax::Sql), "@Filter0");
        assert_eq!(parameter.render(Syntax::Filter), "@Filter0");
        assert_eq!(parameter.render(Syntax::Placeholder), "?");
    }

    #[test]
    fn test_counter() {
        let mut counter = Counter::new();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(Counter::new().next(), 0);
    }
}
