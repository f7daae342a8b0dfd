use std::collections::HashMap;

use crate::fragment::Identifier;
use crate::parameter::Value;

/// Semantic type of a field's values.
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ValueType {
    String,
    Integer,
    Long,
    Decimal,
    Float,
    Boolean,
    DateTime,
    Guid,
    #[default]
    Unknown,
}

/// What a field name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub identifier: Identifier,
    pub value_type: ValueType,
}

impl FilterField {
    pub fn new(identifier: Identifier, value_type: ValueType) -> Self {
        FilterField {
            identifier,
            value_type,
        }
    }
}

/// Resolves the words of a filter that are neither operators nor literals.
///
/// Returning `None` lets the word fall through: a field that is not found is tried as a
/// constant, a constant that is not found as `true`/`false`/`null`. Both lookups should
/// ignore letter case.
pub trait Resolver {
    fn resolve_field(&self, name: &str) -> Option<FilterField>;
    fn resolve_constant(&self, name: &str) -> Option<Value>;
}

impl<F, C> Resolver for (F, C)
where
    F: Fn(&str) -> Option<FilterField>,
    C: Fn(&str) -> Option<Value>,
{
    fn resolve_field(&self, name: &str) -> Option<FilterField> {
        (self.0)(name)
    }

    fn resolve_constant(&self, name: &str) -> Option<Value> {
        (self.1)(name)
    }
}

/// Case-insensitive table of fields and named constants.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    fields: HashMap<String, FilterField>,
    constants: HashMap<String, Value>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn field(mut self, name: &str, identifier: Identifier, value_type: ValueType) -> Self {
        self.insert_field(name, FilterField::new(identifier, value_type));
        self
    }

    pub fn constant(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert_constant(name, value.into());
        self
    }

    pub fn insert_field(&mut self, name: &str, field: FilterField) {
        self.fields.insert(name.to_lowercase(), field);
    }

    pub fn insert_constant(&mut self, name: &str, value: Value) {
        self.constants.insert(name.to_lowercase(), value);
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resolver for Catalog {
    fn resolve_field(&self, name: &str) -> Option<FilterField> {
        self.fields.get(&name.to_lowercase()).cloned()
    }

    fn resolve_constant(&self, name: &str) -> Option<Value> {
        self.constants.get(&name.to_lowercase()).cloned()
    }
}
