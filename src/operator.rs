//! The fixed operator table.
//!
//! Every operator the filter syntax knows is declared once in [`OPERATORS`]: its keyword,
//! its SQL spelling, its shape and the two rendering templates (filter syntax and SQL).
//! Templates are plain text with `{op}`, `{lhs}`, `{rhs}` and `{rhs1}` slots. Operators
//! marked unimplemented stay in the table for documentation but never match a keyword.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::expr::Syntax;

pub const LHS_OP_RHS: &str = "{lhs} {op} {rhs}";
pub const FUNC_LHS_RHS: &str = "{op}({lhs},{rhs})";
pub const FUNC_LHS_RHS_RHS1: &str = "{op}({lhs},{rhs},{rhs1})";
pub const FUNC_LHS: &str = "{op}({lhs})";
pub const FUNC: &str = "{op}()";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum OperatorKind {
    Whitespace,
    /// `and` / `or`
    Binary,
    Logical,
    Arithmetic,
    Grouping,
    Function,
}

/// A filter/SQL template pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Templates {
    pub filter: &'static str,
    pub sql: &'static str,
}

impl Templates {
    pub fn for_syntax(&self, syntax: Syntax) -> &'static str {
        match syntax {
            Syntax::Filter => self.filter,
            Syntax::Sql | Syntax::Placeholder => self.sql,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    keyword: &'static str,
    sql: &'static str,
    kind: OperatorKind,
    templates: Templates,
    overload: Option<Templates>,
    unimplemented: Option<&'static str>,
}

impl Operator {
    /// An operator whose templates are just its spellings.
    const fn new(kind: OperatorKind, keyword: &'static str, sql: &'static str) -> Self {
        Operator {
            keyword,
            sql,
            kind,
            templates: Templates {
                filter: keyword,
                sql,
            },
            overload: None,
            unimplemented: None,
        }
    }

    const fn templates(mut self, filter: &'static str, sql: &'static str) -> Self {
        self.templates = Templates { filter, sql };
        self
    }

    /// Templates used instead when a third operand is present.
    const fn overload(mut self, filter: &'static str, sql: &'static str) -> Self {
        self.overload = Some(Templates { filter, sql });
        self
    }

    const fn unimplemented(mut self, reason: &'static str) -> Self {
        self.unimplemented = Some(reason);
        self
    }

    pub fn keyword(&self) -> &'static str {
        self.keyword
    }

    pub fn sql(&self) -> &'static str {
        self.sql
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn is_function(&self) -> bool {
        self.kind == OperatorKind::Function
    }

    pub fn is_implemented(&self) -> bool {
        self.unimplemented.is_none()
    }

    pub fn unimplemented_reason(&self) -> Option<&'static str> {
        self.unimplemented
    }

    pub fn base_templates(&self) -> Templates {
        self.templates
    }

    pub fn overload_templates(&self) -> Option<Templates> {
        self.overload
    }

    /// The operator's own spelling: the keyword in filter syntax, the SQL text otherwise.
    pub fn spelling(&self, syntax: Syntax) -> &'static str {
        match syntax {
            Syntax::Filter => self.keyword,
            Syntax::Sql | Syntax::Placeholder => self.sql,
        }
    }

    pub fn template(&self, syntax: Syntax, has_right1: bool) -> &'static str {
        match self.overload {
            Some(overload) if has_right1 => overload.for_syntax(syntax),
            _ => self.templates.for_syntax(syntax),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword)
    }
}

use OperatorKind::*;

pub const NEW_LINE: Operator = Operator::new(Whitespace, "", "\r\n");
pub const AND: Operator = Operator::new(Binary, "and", "AND");
pub const OR: Operator = Operator::new(Binary, "or", "OR");

// Canonical functions follow the OData v4 URL conventions.
pub static OPERATORS: &[Operator] = &[
    NEW_LINE,
    Operator::new(Grouping, "(", "("),
    Operator::new(Grouping, ")", ")"),
    OR,
    AND,
    Operator::new(Logical, "eq", "=").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Logical, "not", "NOT").templates("{op} {rhs}", "{op} {rhs}"),
    Operator::new(Logical, "ex", "EXISTS").templates("{op} ({rhs})", "{op} ({rhs})"),
    Operator::new(Logical, "ge", ">=").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Logical, "gt", ">").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Logical, "le", "<=").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Logical, "lt", "<").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Arithmetic, "add", "+").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Arithmetic, "sub", "-").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Arithmetic, "mul", "*").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Arithmetic, "div", "/").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Arithmetic, "mod", "%").templates(LHS_OP_RHS, LHS_OP_RHS),
    Operator::new(Function, "contains", "LIKE")
        .templates(FUNC_LHS_RHS, "{lhs} {op} '%' + {rhs} + '%'"),
    Operator::new(Function, "endswith", "LIKE").templates(FUNC_LHS_RHS, "{lhs} {op} {rhs} + '%'"),
    Operator::new(Function, "startswith", "LIKE").templates(FUNC_LHS_RHS, "{lhs} {op} '%' + {rhs}"),
    Operator::new(Function, "length", "LEN").templates(FUNC_LHS, FUNC_LHS),
    Operator::new(Function, "indexof", "CHARINDEX").templates(FUNC_LHS_RHS, FUNC_LHS_RHS),
    Operator::new(Function, "substring", "SUBSTRING")
        .templates(FUNC_LHS_RHS, FUNC_LHS_RHS)
        .overload(FUNC_LHS_RHS_RHS1, FUNC_LHS_RHS_RHS1),
    Operator::new(Function, "tolower", "LOWER")
        .templates(FUNC_LHS, FUNC_LHS)
        .unimplemented("needs a case-sensitive collation, e.g. attribute = 'k' COLLATE Latin1_General_CS_AS"),
    Operator::new(Function, "toupper", "UPPER")
        .templates(FUNC_LHS, FUNC_LHS)
        .unimplemented("needs a case-sensitive collation, e.g. attribute = 'k' COLLATE Latin1_General_CS_AS"),
    Operator::new(Function, "trim", "LTRIM(RTRIM").templates(FUNC_LHS, "{op}({lhs}))"),
    Operator::new(Function, "concat", "CONCAT").templates(FUNC_LHS_RHS, FUNC_LHS_RHS),
    Operator::new(Function, "year", "DATEPART").templates(FUNC_LHS, "{op}(year, {lhs})"),
    Operator::new(Function, "month", "DATEPART").templates(FUNC_LHS, "{op}(month, {lhs})"),
    Operator::new(Function, "day", "DATEPART").templates(FUNC_LHS, "{op}(day, {lhs})"),
    Operator::new(Function, "hour", "DATEPART").templates(FUNC_LHS, "{op}(hour, {lhs})"),
    Operator::new(Function, "minute", "DATEPART").templates(FUNC_LHS, "{op}(minute, {lhs})"),
    Operator::new(Function, "second", "DATEPART").templates(FUNC_LHS, "{op}(second, {lhs})"),
    Operator::new(Function, "fractionalseconds", "DATEPART")
        .templates(FUNC_LHS, "{op}(millisecond, {lhs})"),
    Operator::new(Function, "date", "?")
        .templates(FUNC_LHS, "?")
        .unimplemented("date"),
    Operator::new(Function, "time", "?")
        .templates(FUNC_LHS, "?")
        .unimplemented("time"),
    Operator::new(Function, "totaloffsetminutes", "?")
        .templates(FUNC_LHS, "?")
        .unimplemented("totaloffsetminutes"),
    Operator::new(Function, "now", "GETUTCDATE").templates(FUNC, FUNC),
    Operator::new(Function, "maxdatetime", "")
        .templates(FUNC, "CAST('9999-12-31 23:59:59.997' AS DATETIME)"),
    Operator::new(Function, "mindatetime", "")
        .templates(FUNC, "CAST('1753-01-01 00:00:00.000' AS DATETIME)"),
    Operator::new(Function, "totalseconds", "?")
        .templates(FUNC_LHS, "?")
        .unimplemented("totalseconds"),
    Operator::new(Function, "round", "ROUND").templates(FUNC_LHS, "{op}({lhs},0)"),
    Operator::new(Function, "floor", "FLOOR").templates(FUNC_LHS, FUNC_LHS),
    Operator::new(Function, "ceiling", "CEILING").templates(FUNC_LHS, FUNC_LHS),
    Operator::new(Function, "isof", "?")
        .templates("?", "?")
        .unimplemented("isof"),
    Operator::new(Function, "cast", "?")
        .templates("?", "?")
        .unimplemented("cast"),
    Operator::new(Function, "geo.distance", "?")
        .templates("?", "?")
        .unimplemented("geo.distance"),
    Operator::new(Function, "geo.intersects", "?")
        .templates("?", "?")
        .unimplemented("geo.intersects"),
    Operator::new(Function, "geo.length", "?")
        .templates("?", "?")
        .unimplemented("geo.length"),
    Operator::new(Function, "any", "?")
        .templates("?", "?")
        .unimplemented("any"),
    Operator::new(Function, "all", "?")
        .templates("?", "?")
        .unimplemented("all"),
];

/// Case-insensitive index over the implemented entries of [`OPERATORS`].
#[derive(Debug)]
pub struct Registry {
    by_keyword: HashMap<String, &'static Operator>,
    functions: HashSet<String>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry, built on first use and read-only afterwards.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::build)
}

impl Registry {
    fn build() -> Self {
        let mut by_keyword = HashMap::new();
        let mut functions = HashSet::new();

        for operator in OPERATORS.iter().filter(|op| op.is_implemented()) {
            let keyword = operator.keyword.to_lowercase();
            if operator.is_function() {
                functions.insert(keyword.clone());
            }
            by_keyword.insert(keyword, operator);
        }

        Registry {
            by_keyword,
            functions,
        }
    }

    /// Finds an implemented operator by keyword, ignoring case.
    pub fn lookup(&self, keyword: &str) -> Option<&'static Operator> {
        self.by_keyword.get(&keyword.to_lowercase()).copied()
    }

    /// Lower-cased keywords of every implemented function.
    pub fn function_keywords(&self) -> &HashSet<String> {
        &self.functions
    }

    pub fn is_function(&self, keyword: &str) -> bool {
        self.functions.contains(&keyword.to_lowercase())
    }

    /// Every declared operator, implemented or not, in declaration order.
    pub fn operators(&self) -> &'static [Operator] {
        OPERATORS
    }
}
