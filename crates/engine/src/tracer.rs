// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event tracer (§4.H).
//!
//! A diagnostic seam: a list of `(kind_pattern, state_template)` watch
//! requests, each paired with an opaque [`TraceSink`] — the same
//! pluggable-collaborator shape as a rule action or a bus observer. `record`
//! is called at well-defined kernel points (event accepted, event skipped,
//! task queued, task running, task errored, rule list decided); a watch
//! fires only when its kind pattern and every templated state key match.

use cascade_core::{simple_display, Event, StateValue};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePoint {
    EventAccepted,
    EventSkipped,
    TaskQueued,
    TaskRunning,
    TaskErrored,
    RuleListDecided,
}

simple_display! {
    TracePoint {
        EventAccepted => "event_accepted",
        EventSkipped => "event_skipped",
        TaskQueued => "task_queued",
        TaskRunning => "task_running",
        TaskErrored => "task_errored",
        RuleListDecided => "rule_list_decided",
    }
}

/// Output sink for a matched trace point. Implementations typically write
/// to a log, a test-collecting `Vec`, or a debugger's event stream.
pub trait TraceSink: Send + Sync {
    fn record(&self, point: TracePoint, event: &Event, location: &str, extras: &HashMap<String, String>);
}

/// How a watch request's kind pattern is compared against an event's dotted
/// kind string.
pub enum KindPattern {
    Equals(String),
    Regex(Regex),
}

impl KindPattern {
    fn matches(&self, dotted_kind: &str) -> bool {
        match self {
            Self::Equals(s) => s == dotted_kind,
            Self::Regex(re) => re.is_match(dotted_kind),
        }
    }
}

/// How a single state-template key is compared against the event's value
/// for that key.
pub enum TemplateMatch {
    /// The key must be present; any value satisfies it.
    Any,
    Equals(StateValue),
    Regex(Regex),
}

impl TemplateMatch {
    fn matches(&self, value: &StateValue) -> bool {
        match self {
            Self::Any => true,
            Self::Equals(v) => v == value,
            Self::Regex(re) => re.is_match(&value.to_string()),
        }
    }
}

/// A single watch: fires when an event's dotted kind matches `kind_pattern`
/// AND every key in `state_template` is present in the event's state with a
/// matching value.
pub struct WatchRequest {
    kind_pattern: KindPattern,
    state_template: HashMap<String, TemplateMatch>,
}

impl WatchRequest {
    pub fn kind_equals(dotted: impl Into<String>) -> Self {
        Self { kind_pattern: KindPattern::Equals(dotted.into()), state_template: HashMap::new() }
    }

    pub fn kind_regex(pattern: Regex) -> Self {
        Self { kind_pattern: KindPattern::Regex(pattern), state_template: HashMap::new() }
    }

    pub fn require(mut self, key: impl Into<String>, template: TemplateMatch) -> Self {
        self.state_template.insert(key.into(), template);
        self
    }

    fn matches(&self, event: &Event) -> bool {
        if !self.kind_pattern.matches(&event.kind_dotted()) {
            return false;
        }
        self.state_template
            .iter()
            .all(|(key, template)| event.state.get(key).is_some_and(|v| template.matches(v)))
    }
}

/// Registry of watch requests, each paired with the sink to notify when it
/// fires.
#[derive(Default)]
pub struct EventTracer {
    watches: Mutex<Vec<(WatchRequest, Arc<dyn TraceSink>)>>,
}

impl EventTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&self, request: WatchRequest, sink: Arc<dyn TraceSink>) {
        self.watches.lock().push((request, sink));
    }

    /// Called at each of the kernel's well-defined tracing points; only
    /// watches whose pattern matches `event` receive the callback.
    pub fn record(&self, point: TracePoint, event: &Event, location: &str, extras: &HashMap<String, String>) {
        for (request, sink) in self.watches.lock().iter() {
            if request.matches(event) {
                sink.record(point, event, location, extras);
            }
        }
    }
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
