//! Type classification for dispatch.
//!
//! Every value maps to exactly one type identifier (a keyword). The
//! algorithm, first match wins:
//!
//! 1. **Metadata override**: if the value carries metadata whose type key
//!    holds a keyword, that keyword is the type. This lets structural data
//!    opt into nominal typing.
//! 2. **Intrinsic category**, in the fixed order of [`CATEGORIES`]. The
//!    order matters where categories overlap: a compiled macro is also a
//!    function value and must classify as `:macro`.
//! 3. Otherwise the value is unclassifiable, which signals a host value
//!    kind the classifier was never taught about.

use std::sync::OnceLock;

use crate::error::{ProtocolError, Result};
use crate::value::{Keyword, Value};

/// Metadata key consulted for type overrides unless configured otherwise.
pub const DEFAULT_TYPE_KEY: &str = "type";

/// Canonical type identifiers for the intrinsic categories.
pub mod tags {
    pub const SYMBOL: &str = "symbol";
    pub const KEYWORD: &str = "keyword";
    pub const ATOM: &str = "atom";
    pub const NIL: &str = "nil";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const NUMBER: &str = "number";
    pub const STRING: &str = "string";
    pub const MACRO: &str = "macro";
    pub const LIST: &str = "list";
    pub const VECTOR: &str = "vector";
    pub const MAP: &str = "map";
    pub const FN: &str = "fn";
}

/// Structural test for one category.
pub type Predicate = fn(&Value) -> bool;

/// Intrinsic categories in precedence order.
pub static CATEGORIES: [(Predicate, &str); 13] = [
    (Value::is_symbol as Predicate, tags::SYMBOL),
    (Value::is_keyword as Predicate, tags::KEYWORD),
    (Value::is_atom as Predicate, tags::ATOM),
    (Value::is_nil as Predicate, tags::NIL),
    (Value::is_true as Predicate, tags::TRUE),
    (Value::is_false as Predicate, tags::FALSE),
    (Value::is_number as Predicate, tags::NUMBER),
    (Value::is_string as Predicate, tags::STRING),
    (Value::is_macro as Predicate, tags::MACRO),
    (Value::is_list as Predicate, tags::LIST),
    (Value::is_vector as Predicate, tags::VECTOR),
    (Value::is_map as Predicate, tags::MAP),
    (Value::is_fn as Predicate, tags::FN),
];

/// Maps values to type identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    type_key: Keyword,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Keyword::new(DEFAULT_TYPE_KEY))
    }
}

impl Classifier {
    /// Create a classifier reading type overrides from `type_key`.
    pub fn new(type_key: Keyword) -> Self {
        Self { type_key }
    }

    /// The metadata key this classifier reads.
    pub fn type_key(&self) -> &Keyword {
        &self.type_key
    }

    /// Classify a value.
    pub fn classify(&self, value: &Value) -> Result<Keyword> {
        if let Some(tag) = self.type_override(value) {
            return Ok(tag.clone());
        }

        intrinsic_category(value)
            .map(Keyword::new)
            .ok_or_else(|| ProtocolError::UnclassifiableValue {
                value: value.clone(),
            })
    }

    /// The nominal type a value's metadata imposes, if any.
    ///
    /// A type key holding anything other than a keyword is ignored and the
    /// value falls back to structural classification.
    pub fn type_override<'v>(&self, value: &'v Value) -> Option<&'v Keyword> {
        value.meta()?.get(&self.type_key)?.as_keyword()
    }
}

/// The structural category of a value, ignoring metadata.
pub fn intrinsic_category(value: &Value) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(matches, _)| matches(value))
        .map(|&(_, tag)| tag)
}

/// Classify a value with the default type key.
pub fn classify(value: &Value) -> Result<Keyword> {
    static DEFAULT: OnceLock<Classifier> = OnceLock::new();
    DEFAULT.get_or_init(Classifier::default).classify(value)
}
