use ariadne::{self, Config, Label, Report, ReportKind, Source};
use std::fmt;
use thiserror::Error;

use crate::builder::Position;

pub type Result<T> = std::result::Result<T, ParseError>;

/// A 1-based line/column pair inside the filter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Every way a compile call can fail. None of them is recoverable within the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{message} ({location})")]
    Tokenize { message: String, location: Location },

    #[error(
        "unable to resolve '{token}' as field, constant or literal for operator '{operator}', position {position} ({location})"
    )]
    UnresolvedOperand {
        token: String,
        operator: String,
        position: Position,
        location: Location,
    },

    #[error("missing operator{}", at_suffix(.token, .location))]
    MissingOperator {
        token: Option<String>,
        location: Option<Location>,
    },

    #[error("{message}{}", at_suffix(.token, .location))]
    Structural {
        message: String,
        token: Option<String>,
        location: Option<Location>,
    },
}

fn at_suffix(token: &Option<String>, location: &Option<Location>) -> String {
    match (token, location) {
        (Some(token), Some(location)) => format!(" near '{}' ({})", token, location),
        (Some(token), None) => format!(" near '{}'", token),
        (None, Some(location)) => format!(" ({})", location),
        (None, None) => String::new(),
    }
}

impl ParseError {
    pub fn structural(message: impl Into<String>) -> Self {
        ParseError::Structural {
            message: message.into(),
            token: None,
            location: None,
        }
    }

    pub fn structural_at(message: impl Into<String>, token: &str, location: Location) -> Self {
        ParseError::Structural {
            message: message.into(),
            token: Some(token.to_string()),
            location: Some(location),
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            ParseError::Tokenize { location, .. } => Some(*location),
            ParseError::UnresolvedOperand { location, .. } => Some(*location),
            ParseError::MissingOperator { location, .. } => *location,
            ParseError::Structural { location, .. } => *location,
        }
    }

    fn token(&self) -> Option<&str> {
        match self {
            ParseError::Tokenize { .. } => None,
            ParseError::UnresolvedOperand { token, .. } => Some(token),
            ParseError::MissingOperator { token, .. } => token.as_deref(),
            ParseError::Structural { token, .. } => token.as_deref(),
        }
    }

    /// Short headline used as the report title.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Tokenize { .. } => "Tokenize error",
            ParseError::UnresolvedOperand { .. } => "Unresolved operand",
            ParseError::MissingOperator { .. } => "Missing operator",
            ParseError::Structural { .. } => "Structural error",
        }
    }
}

const SOURCE_NAME: &str = "filter";

/// Prints a report for `error` against the filter text it came from.
pub fn print_error(source: &str, error: &ParseError) -> std::io::Result<()> {
    build_report(source, error, true).eprint((SOURCE_NAME, Source::from(source)))
}

/// Same report as [`print_error`], without colors, returned as a string.
pub fn format_error(source: &str, error: &ParseError) -> String {
    let mut buffer = Vec::<u8>::new();
    let report = build_report(source, error, false);
    if report
        .write((SOURCE_NAME, Source::from(source)), &mut buffer)
        .is_err()
    {
        return error.to_string();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn build_report<'a>(
    source: &str,
    error: &ParseError,
    color: bool,
) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
    let span = error_span(source, error);

    Report::build(ReportKind::Error, (SOURCE_NAME, span.clone()))
        .with_config(Config::default().with_color(color))
        .with_message(error.kind())
        .with_label(Label::new((SOURCE_NAME, span)).with_message(error.to_string()))
        .finish()
}

/// Converts the error's line/column into a char range ariadne can label.
fn error_span(source: &str, error: &ParseError) -> std::ops::Range<usize> {
    let total = source.chars().count();
    let Some(location) = error.location() else {
        return 0..total;
    };

    let start = char_offset(source, location).min(total);
    let width = error.token().map(|t| t.chars().count()).unwrap_or(1).max(1);
    start..(start + width).min(total.max(start))
}

fn char_offset(source: &str, location: Location) -> usize {
    let preceding: usize = source
        .split('\n')
        .take(location.line.saturating_sub(1))
        .map(|line| line.chars().count() + 1)
        .sum();
    preceding + location.column.saturating_sub(1)
}
