//! Value payloads attached to terminal states.

use serde::{Deserialize, Serialize};

/// Payload stored for a key.
///
/// Exactly these two classes round-trip through the binary container:
/// non-negative integers and strings. The container stores values as
/// character data, so an all-digit string decodes as [`Value::Int`];
/// richer payloads belong in the text interchange format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A non-negative integer.
    Int(u64),
    /// A string in the automaton's character set.
    Str(String),
}

impl Value {
    /// Render the value as the character data the container stores.
    pub fn to_text(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    /// Inverse of [`to_text`](Self::to_text): all-digit data is an
    /// integer, anything else a string.
    pub fn from_text(text: &str) -> Value {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = text.parse::<u64>() {
                return Value::Int(n);
            }
        }
        Value::Str(text.to_string())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// A successful lookup: the key echoed back plus its stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The key as queried.
    pub key: String,
    /// The stored value, if the key carried one.
    pub value: Option<Value>,
}

/// A fuzzy-search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The matching key.
    pub term: String,
    /// Edit distance from the query.
    pub distance: usize,
}
