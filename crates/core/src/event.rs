// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event type.
//!
//! An `Event` is immutable once constructed: it is created by a client or by
//! a rule action, handed to the processor, and read-only thereafter (§3).

use crate::state::StateValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event posted into the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Free-form label. Also the triggering-cache key (§3, §9 — a known hazard).
    pub name: String,
    /// Ordered dot-path segments, e.g. `["core", "main", "event1"]`.
    pub kind: Vec<String>,
    /// Arbitrary key to scalar-tagged value.
    pub state: HashMap<String, StateValue>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<Vec<String>>,
        state: HashMap<String, StateValue>,
    ) -> Self {
        Self { name: name.into(), kind: kind.into(), state }
    }

    /// Parse a dot-separated kind string into path segments, e.g.
    /// `"core.main.event1"` → `["core", "main", "event1"]`.
    pub fn kind_from_dotted(kind: &str) -> Vec<String> {
        kind.split('.').map(str::to_string).collect()
    }

    /// The dotted string form of `kind`, used by the event tracer's kind-pattern match.
    pub fn kind_dotted(&self) -> String {
        self.kind.join(".")
    }
}

crate::builder! {
    pub struct EventBuilder => Event {
        into {
            name: String = "event",
        }
        set {
            kind: Vec<String> = Vec::new(),
            state: HashMap<String, StateValue> = HashMap::new(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl EventBuilder {
    pub fn dotted_kind(self, kind: &str) -> Self {
        self.kind(Event::kind_from_dotted(kind))
    }

    pub fn state_entry(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }
}
