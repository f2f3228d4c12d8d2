// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule records.
//!
//! A `Rule` is the compiled form of an embedded-language "sink" declaration
//! (§6): the interpreter is responsible for producing one, the kernel is
//! only responsible for storing, indexing, and running it. `Rule` is generic
//! over the processor and monitor handle types its action callback receives,
//! so this crate never needs to depend on `cascade-engine` to describe the
//! action's signature.

use crate::event::Event;
use crate::state::StateValue;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// An action callback's failure. Wraps the interpreter's own error type
/// behind a single boxed `std::error::Error` so the kernel never needs to
/// know its concrete shape.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActionError(#[from] Box<dyn std::error::Error + Send + Sync>);

impl ActionError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }

    pub fn msg(text: impl Into<String>) -> Self {
        #[derive(Debug, Error)]
        #[error("{0}")]
        struct Message(String);
        Self(Box::new(Message(text.into())))
    }
}

/// A boxed rule-action callback. `P` and `M` are the processor and monitor
/// handle types; `cascade-engine` instantiates both. `tid` is the id of the
/// worker thread running the action.
pub type RuleAction<P, M> =
    Arc<dyn Fn(&P, &M, &Event, u64) -> Result<(), ActionError> + Send + Sync>;

/// How a rule's `state_match` entry is tested against the corresponding
/// `Event::state` value.
#[derive(Debug, Clone)]
pub enum StateMatcher {
    /// The event must carry this exact value for the key.
    Equals(StateValue),
    /// The key must be present; the event's value is stringified and must
    /// match this compiled pattern.
    Regex(Regex),
    /// The key must merely be present, with any value.
    AnyPresent,
}

impl PartialEq for StateMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Equals(a), Self::Equals(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::AnyPresent, Self::AnyPresent) => true,
            _ => false,
        }
    }
}

/// Errors raised while constructing or registering a [`Rule`].
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {name:?} has an empty kind_match: every rule must match at least one kind path")]
    EmptyKindMatch { name: String },

    #[error("rule {name:?} has an empty scope_match: every rule must declare at least one scope path")]
    EmptyScopeMatch { name: String },

    #[error("rule {name:?} has an invalid regex for state key {key:?}: {source}")]
    InvalidRegex {
        name: String,
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule name {name:?} is already registered")]
    DuplicateName { name: String },
}

/// A compiled rule: the unit the rule index stores and the processor runs.
///
/// `kind_match` entries are dot-paths (e.g. `"core.main.*"`, where `*`
/// matches exactly one segment). Immutable once constructed; rules are only
/// ever added while the processor is stopped (§4.G).
#[derive(Clone)]
pub struct Rule<P, M> {
    pub name: String,
    pub description: String,
    pub kind_match: Vec<Vec<String>>,
    pub scope_match: Vec<String>,
    pub state_match: HashMap<String, StateMatcher>,
    /// Lower is higher priority; 0 is maximum.
    pub priority: i32,
    /// Names of rules this rule vetoes when both would fire for the same event.
    pub suppression_list: Vec<String>,
    pub action: RuleAction<P, M>,
}

impl<P, M> Rule<P, M> {
    /// Validate the invariants the processor requires before registration:
    /// a non-empty `kind_match` and a non-empty `scope_match` (§4.G `add_rule`).
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.kind_match.is_empty() {
            return Err(RuleError::EmptyKindMatch { name: self.name.clone() });
        }
        if self.scope_match.is_empty() {
            return Err(RuleError::EmptyScopeMatch { name: self.name.clone() });
        }
        Ok(())
    }

    /// Dot-path kind match strings, e.g. `["core.main.*"]`.
    pub fn kind_match_dotted(&self) -> Vec<String> {
        self.kind_match.iter().map(|segs| segs.join(".")).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct RuleBuilder<P, M> {
    name: String,
    description: String,
    kind_match: Vec<Vec<String>>,
    scope_match: Vec<String>,
    state_match: HashMap<String, StateMatcher>,
    priority: i32,
    suppression_list: Vec<String>,
    action: RuleAction<P, M>,
}

#[cfg(any(test, feature = "test-support"))]
impl<P, M> Default for RuleBuilder<P, M> {
    fn default() -> Self {
        Self {
            name: "rule".to_string(),
            description: String::new(),
            kind_match: Vec::new(),
            scope_match: Vec::new(),
            state_match: HashMap::new(),
            priority: 0,
            suppression_list: Vec::new(),
            action: Arc::new(|_, _, _, _| Ok(())),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl<P, M> RuleBuilder<P, M> {
    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = v.into();
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.description = v.into();
        self
    }

    /// Adds one kind-match dot-path, e.g. `"core.main.*"`.
    pub fn kind(mut self, dotted: &str) -> Self {
        self.kind_match.push(Event::kind_from_dotted(dotted));
        self
    }

    pub fn scope(mut self, path: impl Into<String>) -> Self {
        self.scope_match.push(path.into());
        self
    }

    pub fn state(mut self, key: impl Into<String>, matcher: StateMatcher) -> Self {
        self.state_match.insert(key.into(), matcher);
        self
    }

    pub fn priority(mut self, v: i32) -> Self {
        self.priority = v;
        self
    }

    pub fn suppresses(mut self, rule_name: impl Into<String>) -> Self {
        self.suppression_list.push(rule_name.into());
        self
    }

    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&P, &M, &Event, u64) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.action = Arc::new(f);
        self
    }

    pub fn build(self) -> Rule<P, M> {
        Rule {
            name: self.name,
            description: self.description,
            kind_match: self.kind_match,
            scope_match: self.scope_match,
            state_match: self.state_match,
            priority: self.priority,
            suppression_list: self.suppression_list,
            action: self.action,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl<P, M> Rule<P, M> {
    pub fn builder() -> RuleBuilder<P, M> {
        RuleBuilder::default()
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
