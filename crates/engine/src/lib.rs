// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cascade-engine: the ECA kernel's dispatch machinery.
//!
//! Built on top of `cascade-core`'s domain types: a two-stage rule matcher
//! (`rule_index`), a cascade-tracking monitor tree (`monitor`), a fair
//! cross-cascade task queue (`task_queue`), an OS-thread worker pool
//! (`worker_pool`), a generic pub/sub bus (`bus`), a diagnostic event tracer
//! (`tracer`), and the `processor` facade that ties all of it together.

pub mod bus;
pub mod config;
pub mod error;
pub mod monitor;
pub mod processor;
pub mod rule_index;
pub mod task_queue;
pub mod tracer;
pub mod worker_pool;

pub use bus::{Bus, ANY_EVENT};
pub use config::ProcessorConfig;
pub use error::{ErrorBundle, MonitorError, ProcessorError};
pub use monitor::{Monitor, MonitorId, MonitorStateError, RootMonitor, MESSAGE_ROOT_MONITOR_FINISHED};
pub use processor::{EngineRule, EngineRuleIndex, Processor};
pub use rule_index::{IndexError, RuleIndex};
pub use task_queue::{Task, TaskQueue};
pub use tracer::{EventTracer, KindPattern, TemplateMatch, TracePoint, TraceSink, WatchRequest};
pub use worker_pool::{WorkerId, WorkerPool};
