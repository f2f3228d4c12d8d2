// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processor (§4.G): the facade the interpreter and rule actions call
//! into, tying the rule index, monitor tree, task queue, and worker pool
//! together.

use crate::bus::Bus;
use crate::config::ProcessorConfig;
use crate::error::{ErrorBundle, MonitorError, ProcessorError};
use crate::monitor::{Monitor, MonitorId, MESSAGE_ROOT_MONITOR_FINISHED};
use crate::rule_index::{IndexError, RuleIndex};
use crate::task_queue::{Task, TaskQueue};
use crate::tracer::{EventTracer, TracePoint};
use crate::worker_pool::WorkerPool;
use cascade_core::{Event, Rule, RuleScope};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A rule instantiated for this kernel: its action receives a [`Processor`]
/// handle and the [`Monitor`] of the event it's reacting to.
pub type EngineRule = Rule<Processor, Monitor>;
pub type EngineRuleIndex = RuleIndex<Processor, Monitor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Stopped,
    Running,
    Stopping,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

struct Inner {
    config: ProcessorConfig,
    fail_on_first_error: AtomicBool,
    status: Mutex<Status>,
    rule_index: RwLock<EngineRuleIndex>,
    triggering_cache: RwLock<HashMap<String, bool>>,
    task_queue: Arc<TaskQueue>,
    bus: Arc<Bus<MonitorId>>,
    tracer: EventTracer,
    worker_pool: Mutex<Option<WorkerPool>>,
    root_monitor_error_observer: Mutex<Option<Arc<dyn Fn(MonitorId, &ErrorBundle) + Send + Sync>>>,
}

/// A cheaply-cloned handle to the kernel's engine facade.
#[derive(Clone)]
pub struct Processor(Arc<Inner>);

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        let fail_on_first_error = AtomicBool::new(config.fail_on_first_error_in_trigger_sequence);
        let bus = Arc::new(Bus::new());
        let task_queue = TaskQueue::new(bus.clone());
        Self(Arc::new(Inner {
            config,
            fail_on_first_error,
            status: Mutex::new(Status::Stopped),
            rule_index: RwLock::new(EngineRuleIndex::new()),
            triggering_cache: RwLock::new(HashMap::new()),
            task_queue,
            bus,
            tracer: EventTracer::new(),
            worker_pool: Mutex::new(None),
            root_monitor_error_observer: Mutex::new(None),
        }))
    }

    pub fn tracer(&self) -> &EventTracer {
        &self.0.tracer
    }

    /// Register `rule`. Only permitted while `Stopped`; rule index lookups
    /// are built once and read through an `RwLock` thereafter so `Running`
    /// readers never contend with each other (§4.G).
    pub fn add_rule(&self, rule: EngineRule) -> Result<(), ProcessorError> {
        if *self.0.status.lock() != Status::Stopped {
            return Err(ProcessorError::NotStopped);
        }
        rule.validate()?;
        tracing::debug!(rule = %rule.name, kinds = ?rule.kind_match_dotted(), "registering rule");
        let result = self.0.rule_index.write().add_rule(rule).map_err(|err| match err {
            IndexError::DuplicateName(name) => ProcessorError::DuplicateName(name),
            IndexError::StateLeafFull(name) => ProcessorError::TooManyStateRules(name),
        });
        // A newly registered rule can turn a name the cache remembers as
        // non-triggering into one that now matches (§3, §4.G): invalidate
        // unconditionally rather than try to reason about which names the
        // new rule affects.
        self.0.triggering_cache.write().clear();
        result
    }

    /// Clear every registered rule and the triggering cache. Only permitted
    /// while `Stopped`.
    pub fn reset(&self) -> Result<(), ProcessorError> {
        if *self.0.status.lock() != Status::Stopped {
            return Err(ProcessorError::NotStopped);
        }
        *self.0.rule_index.write() = EngineRuleIndex::new();
        self.0.triggering_cache.write().clear();
        Ok(())
    }

    /// Spawn the fixed-size worker pool and start accepting events.
    pub fn start(&self) {
        *self.0.status.lock() = Status::Running;
        let queue = self.0.task_queue.clone();
        let pool = WorkerPool::start(self.0.config.worker_count, queue, |task, worker_id| {
            task.processor.run_task(&task.monitor, &task.event, worker_id.get());
        });
        *self.0.worker_pool.lock() = Some(pool);
        tracing::info!(workers = self.0.config.worker_count, "processor started");
    }

    /// Stop accepting events, drain and join every worker, then return to
    /// `Stopped`. There is no task cancellation — in-flight actions run to
    /// completion (§4.F).
    pub fn finish(&self) {
        *self.0.status.lock() = Status::Stopping;
        if let Some(pool) = self.0.worker_pool.lock().take() {
            pool.stop(&self.0.task_queue);
        }
        *self.0.status.lock() = Status::Stopped;
        tracing::info!("processor finished");
    }

    /// Create a fresh cascade root. `scope` of `None` allows every path.
    pub fn new_root_monitor(&self, context: HashMap<String, serde_json::Value>, scope: Option<RuleScope>) -> Monitor {
        let monitor = Monitor::new_root(0, scope.unwrap_or_else(RuleScope::allow_all), self.0.bus.clone());
        for (key, value) in context {
            monitor.context_set(key, value);
        }
        monitor
    }

    pub fn set_fail_on_first_error_in_trigger_sequence(&self, value: bool) {
        self.0.fail_on_first_error.store(value, Ordering::Relaxed);
    }

    pub fn set_root_monitor_error_observer<F>(&self, cb: F)
    where
        F: Fn(MonitorId, &ErrorBundle) + Send + Sync + 'static,
    {
        *self.0.root_monitor_error_observer.lock() = Some(Arc::new(cb));
    }

    /// Post `event` against `monitor` (or a fresh root, if `None`). Stage one
    /// of matching (`is_triggering`, cached by event name) is checked first:
    /// a non-triggering event never creates a monitor when none was
    /// supplied, and skips (without ever being dispatched) whichever monitor
    /// was — the caller always gets `(None, None)` back in that case (§4.G,
    /// §8 Scenario 6).
    pub fn add_event(&self, event: Event, monitor: Option<Monitor>) -> (Option<Monitor>, Option<ProcessorError>) {
        let status = *self.0.status.lock();
        if status != Status::Running {
            return (None, Some(ProcessorError::NotRunning { state: status.as_str() }));
        }

        if !self.is_triggering_cached(&event) {
            self.0.tracer.record(TracePoint::EventSkipped, &event, "add_event", &HashMap::new());
            if let Some(monitor) = monitor {
                if let Err(err) = monitor.skip(event) {
                    tracing::warn!(error = %err, monitor_id = %monitor.id(), "monitor skip rejected");
                }
            }
            return (None, None);
        }

        let monitor = monitor.unwrap_or_else(|| self.new_root_monitor(HashMap::new(), None));
        self.0.tracer.record(TracePoint::EventAccepted, &event, "add_event", &HashMap::new());
        if let Err(err) = monitor.activate(event.clone()) {
            tracing::warn!(error = %err, monitor_id = %monitor.id(), "monitor activation rejected");
            return (Some(monitor), None);
        }
        self.0.tracer.record(TracePoint::TaskQueued, &event, "add_event", &HashMap::new());
        self.0.task_queue.push(Task::new(self.clone(), monitor.clone(), event));
        (Some(monitor), None)
    }

    /// Like [`Self::add_event`], but blocks the calling thread until the
    /// event's cascade root finishes. The triggering decision is re-checked
    /// here (safe: the rule index is immutable while `Running`) so the
    /// waiter can be subscribed to the root's completion message *before*
    /// the task is queued, closing the race where a worker could finish the
    /// cascade before anyone is listening for it.
    pub fn add_event_and_wait(&self, event: Event, root_monitor: Option<Monitor>) -> (Option<Monitor>, Option<ProcessorError>) {
        let status = *self.0.status.lock();
        if status != Status::Running {
            return (None, Some(ProcessorError::NotRunning { state: status.as_str() }));
        }

        if !self.is_triggering_cached(&event) {
            if let Some(monitor) = root_monitor {
                if let Err(err) = monitor.skip(event) {
                    tracing::warn!(error = %err, monitor_id = %monitor.id(), "monitor skip rejected");
                }
            }
            return (None, None);
        }

        let root = root_monitor.unwrap_or_else(|| self.new_root_monitor(HashMap::new(), None));
        let root_id = root.root_monitor().id();

        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let gate_cb = gate.clone();
        self.0.bus.add_observer(MESSAGE_ROOT_MONITOR_FINISHED, Some(root_id), move |_, _| {
            let (done, cvar) = &*gate_cb;
            *done.lock() = true;
            cvar.notify_all();
        });

        let (monitor, err) = self.add_event(event, Some(root));
        if err.is_some() {
            self.0.bus.remove_observers(MESSAGE_ROOT_MONITOR_FINISHED, Some(&root_id));
            return (monitor, err);
        }

        let (done, cvar) = &*gate;
        let mut guard = done.lock();
        while !*guard {
            cvar.wait(&mut guard);
        }
        drop(guard);
        // The waiter is done with this root's completion message; remove it
        // so it doesn't linger on the bus for the lifetime of the processor.
        self.0.bus.remove_observers(MESSAGE_ROOT_MONITOR_FINISHED, Some(&root_id));
        (monitor, None)
    }

    fn is_triggering_cached(&self, event: &Event) -> bool {
        // Keyed by event name only (§9 Open Question): the reference
        // leaves the cache key unspecified, and kind/state can vary per
        // post of the same named event, but in practice callers reuse one
        // kind per name, and the cache is purely an optimization over the
        // always-correct `rule_index.is_triggering` fallback.
        if let Some(&cached) = self.0.triggering_cache.read().get(&event.name) {
            return cached;
        }
        let triggering = self.0.rule_index.read().is_triggering(event);
        self.0.triggering_cache.write().insert(event.name.clone(), triggering);
        triggering
    }

    /// Run every rule matched for `event` against `monitor`: full
    /// state-match, scope filter, suppression, priority order, then the
    /// action callbacks (§4.G steps 1-7).
    fn run_task(&self, monitor: &Monitor, event: &Event, tid: u64) {
        self.0.tracer.record(TracePoint::TaskRunning, event, "worker", &HashMap::new());

        let candidates = self.0.rule_index.read().match_event(event);
        let scope = monitor.root_monitor().rule_scope().clone();
        let in_scope: Vec<_> = candidates
            .into_iter()
            .filter(|rule| scope.is_allowed_all(rule.scope_match.iter().map(String::as_str)))
            .collect();

        let suppressed: HashSet<String> =
            in_scope.iter().flat_map(|rule| rule.suppression_list.iter().cloned()).collect();
        let mut survivors: Vec<_> =
            in_scope.into_iter().filter(|rule| !suppressed.contains(&rule.name)).collect();
        survivors.sort_by_key(|rule| rule.priority);

        self.0.tracer.record(TracePoint::RuleListDecided, event, "worker", &HashMap::new());

        let mut errors = ErrorBundle::new();
        for rule in &survivors {
            if let Err(source) = (rule.action)(self, monitor, event, tid) {
                tracing::warn!(rule = %rule.name, error = %source, monitor_id = %monitor.id(), "rule action failed");
                self.0.tracer.record(TracePoint::TaskErrored, event, "worker", &HashMap::new());
                errors.insert(rule.name.clone(), MonitorError { rule_name: rule.name.clone(), source });
                if self.0.fail_on_first_error.load(Ordering::Relaxed) {
                    break;
                }
            }
        }

        if !errors.is_empty() {
            monitor.set_errors(errors.clone());
            if let Some(observer) = self.0.root_monitor_error_observer.lock().as_ref() {
                observer(monitor.root_monitor().id(), &errors);
            }
        }

        if let Err(err) = monitor.finish() {
            // A monitor that reaches the end of `run_task` without having
            // been activated, or that's already finished, is an internal
            // invariant violation (§7): every queued task's monitor was
            // activated by `add_event` immediately before queueing.
            debug_assert!(false, "finish() on a freshly-run task's monitor failed: {err}");
            tracing::error!(error = %err, monitor_id = %monitor.id(), "monitor finish failed after task run");
        }
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
