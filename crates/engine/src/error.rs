// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor-level error types.
//!
//! Two kinds of failure are distinguished throughout the kernel (§7):
//! configuration errors are programmer mistakes, surfaced synchronously to
//! the caller; action errors happen inside a rule's callback and are
//! aggregated onto the cascade instead of propagating.

use cascade_core::{ActionError, RuleError};
use thiserror::Error;

/// Errors the processor surfaces synchronously to its caller.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("add_rule called while the processor is running; rules may only be added while stopped")]
    NotStopped,

    #[error("a rule named {0:?} is already registered")]
    DuplicateName(String),

    #[error("state-match leaf already holds the maximum of 64 rules; rule {0:?} cannot be added")]
    TooManyStateRules(String),

    #[error(transparent)]
    InvalidRule(#[from] RuleError),

    #[error("add_event called while the processor is not running (state: {state})")]
    NotRunning { state: &'static str },
}

/// Per-rule action failure, captured on the monitor rather than propagated.
#[derive(Debug, Error)]
#[error("rule {rule_name:?} failed: {source}")]
pub struct MonitorError {
    pub rule_name: String,
    #[source]
    pub source: ActionError,
}

/// The aggregated error state of a finished cascade: one entry per rule that
/// failed while acting on any event in the cascade.
pub type ErrorBundle = std::collections::HashMap<String, MonitorError>;
