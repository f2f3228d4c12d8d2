// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event and rule state values.
//!
//! The reference description allows "arbitrary key to arbitrary value" event
//! state. This port narrows values to a tagged union of scalars (§9 Design
//! Notes) so that `StateValue` has total equality and hashing and can sit in
//! a plain `HashMap` key or bitmask-matcher value map without reaching for a
//! dynamic-typing crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value carried in `Event::state` or matched by `StateMatcher::Equals`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl StateValue {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn int(v: i64) -> Self {
        Self::Int(v)
    }

    pub fn bool(v: bool) -> Self {
        Self::Bool(v)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// `Display` is the stringification the rule-index regex matcher uses: a
/// `Regex` state matcher matches against `value.to_string()`, never against
/// the typed value directly.
impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_stringifies_each_variant() {
        assert_eq!(StateValue::str("val").to_string(), "val");
        assert_eq!(StateValue::int(42).to_string(), "42");
        assert_eq!(StateValue::bool(true).to_string(), "true");
    }

    #[test]
    fn equality_is_variant_and_value_sensitive() {
        assert_eq!(StateValue::str("42"), StateValue::str("42"));
        assert_ne!(StateValue::str("42"), StateValue::int(42));
        assert_ne!(StateValue::int(1), StateValue::int(2));
    }

    #[test]
    fn from_impls_build_the_right_variant() {
        assert_eq!(StateValue::from("x"), StateValue::Str("x".to_string()));
        assert_eq!(StateValue::from(3i64), StateValue::Int(3));
        assert_eq!(StateValue::from(false), StateValue::Bool(false));
    }
}
