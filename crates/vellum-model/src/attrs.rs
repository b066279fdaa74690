//! Typed attribute values for nodes and marks.
//!
//! Attributes use an ordered map so that structural equality and iteration
//! order are deterministic regardless of insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(SmolStr::new(s))
    }
}

impl From<SmolStr> for AttrValue {
    fn from(s: SmolStr) -> Self {
        Self::Str(s)
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(SmolStr::new(s))
    }
}

/// Attribute map keyed by attribute name.
pub type Attrs = BTreeMap<SmolStr, AttrValue>;

/// Build an attribute map from literal pairs.
pub fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> Attrs {
    pairs
        .into_iter()
        .map(|(k, v)| (SmolStr::new(k), v))
        .collect()
}
