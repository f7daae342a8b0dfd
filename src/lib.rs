//! Compiles OData-style filter expressions such as
//! `(status eq InTransit or status eq Delivered) and substring(CustomerName,1,3) eq 'Jim'`
//! into a [`Criteria`] tree that renders as parameterized SQL, as positional-placeholder
//! SQL or back into filter syntax. Literal values never end up in the SQL text; they are
//! bound as [`Parameter`]s.

pub mod builder;
pub mod criteria;
pub mod docs;
pub mod error;
pub mod expr;
pub mod fragment;
pub mod operator;
pub mod parameter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod syntax;
pub mod token_type;

pub use criteria::Criteria;
pub use error::{ParseError, Result};
pub use expr::{Expression, Render, Syntax};
pub use fragment::{Identifier, SqlFragment};
pub use parameter::{Parameter, Value};
pub use parser::{ParseOptions, Parser, parse, parse_with, try_parse};
pub use resolver::{Catalog, FilterField, Resolver, ValueType};
