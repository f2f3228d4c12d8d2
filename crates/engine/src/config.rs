// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor configuration.

/// Settings fixed at [`crate::processor::Processor::start`] time (§7).
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Number of OS-thread workers to spawn. Fixed for the lifetime of a
    /// `Running` processor; changing it requires `stop` then `start` again.
    pub worker_count: usize,
    /// If set, `process_event` stops running further rules for an event as
    /// soon as one rule's action fails; events the failed rule already
    /// queued still proceed (§4.G step 7).
    pub fail_on_first_error_in_trigger_sequence: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            fail_on_first_error_in_trigger_sequence: false,
        }
    }
}

impl ProcessorConfig {
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count, ..Self::default() }
    }

    cascade_core::setters! {
        set {
            worker_count: usize,
            fail_on_first_error_in_trigger_sequence: bool,
        }
    }
}
