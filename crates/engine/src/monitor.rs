// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor tree (§4.D).
//!
//! Every event cascade is rooted in a [`RootMonitor`]; each rule action that
//! re-emits creates a [`ChildMonitor`] under it via
//! [`Monitor::new_child_monitor`]. The root aggregates in-flight descendant
//! counts by priority and posts a single completion notification on the bus
//! once every descendant has finished.

use crate::bus::Bus;
use crate::error::ErrorBundle;
use cascade_core::{define_monotonic_id, Event, RuleScope};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

define_monotonic_id! {
    /// Identifies a monitor (root or child) for observability and bus routing.
    pub struct MonitorId;
}

/// Bus event name posted once a root monitor's entire cascade has finished.
pub const MESSAGE_ROOT_MONITOR_FINISHED: &str = "MessageRootMonitorFinished";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStateError {
    #[error("monitor is already activated")]
    AlreadyActivated,
    #[error("monitor has already finished")]
    AlreadyFinished,
    #[error("monitor has not been activated yet")]
    NotActivated,
}

struct MonitorCore {
    id: MonitorId,
    priority: i32,
    context: Mutex<HashMap<String, serde_json::Value>>,
    activated: AtomicBool,
    /// Set only by `activate`, never by `skip` — distinguishes a monitor
    /// that was actually dispatched (and so holds a priority-counter slot)
    /// from one that was merely skipped.
    dispatched: AtomicBool,
    finished: AtomicBool,
    event: Mutex<Option<Event>>,
    errors: Mutex<Option<ErrorBundle>>,
}

impl MonitorCore {
    fn new(priority: i32) -> Self {
        Self {
            id: MonitorId::next(),
            priority,
            context: Mutex::new(HashMap::new()),
            activated: AtomicBool::new(false),
            dispatched: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            event: Mutex::new(None),
            errors: Mutex::new(None),
        }
    }
}

struct RootAggregate {
    unfinished: usize,
    incomplete_by_priority: HashMap<i32, usize>,
    /// Min-heap of priorities currently in `incomplete_by_priority`; cleaned
    /// lazily of stale (zeroed) entries at read time, the same idiom the
    /// task queue uses for its empty per-cascade queues (§4.E, §9).
    priorities_heap: BinaryHeap<Reverse<i32>>,
    errors: HashMap<MonitorId, ErrorBundle>,
}

/// The root of an event cascade. Owns the cascade's aggregation state and
/// scope ACL.
pub struct RootMonitor {
    core: MonitorCore,
    scope: RuleScope,
    aggregate: Mutex<RootAggregate>,
    finish_handler: Mutex<Option<Box<dyn FnOnce(&RootMonitor) + Send>>>,
    bus: Arc<Bus<MonitorId>>,
}

impl RootMonitor {
    fn new(priority: i32, scope: RuleScope, bus: Arc<Bus<MonitorId>>) -> Arc<Self> {
        Arc::new(Self {
            core: MonitorCore::new(priority),
            scope,
            // The root counts as its own first in-flight descendant: it is
            // activated and finished exactly like any child.
            aggregate: Mutex::new(RootAggregate {
                unfinished: 1,
                incomplete_by_priority: HashMap::new(),
                priorities_heap: BinaryHeap::new(),
                errors: HashMap::new(),
            }),
            finish_handler: Mutex::new(None),
            bus,
        })
    }

    fn descendant_created(&self) {
        self.aggregate.lock().unfinished += 1;
    }

    /// The lowest (highest-priority) value among currently activated, not
    /// yet finished, descendants; `None` once the cascade is fully drained.
    pub fn highest_priority(&self) -> Option<i32> {
        let mut agg = self.aggregate.lock();
        loop {
            let Some(&Reverse(p)) = agg.priorities_heap.peek() else {
                return None;
            };
            if agg.incomplete_by_priority.get(&p).copied().unwrap_or(0) == 0 {
                agg.priorities_heap.pop();
            } else {
                return Some(p);
            }
        }
    }

    pub fn unfinished_count(&self) -> usize {
        self.aggregate.lock().unfinished
    }

    /// Errors aggregated across every descendant in the cascade, keyed by
    /// the monitor that recorded them. Meaningful once the root has
    /// finished.
    pub fn errors(&self) -> HashMap<MonitorId, ErrorBundle> {
        self.aggregate.lock().errors.clone()
    }

    pub fn rule_scope(&self) -> &RuleScope {
        &self.scope
    }

    /// Register a callback invoked exactly once when the cascade completes.
    /// Replaces any previously set handler.
    pub fn set_finish_handler<F>(&self, handler: F)
    where
        F: FnOnce(&RootMonitor) + Send + 'static,
    {
        *self.finish_handler.lock() = Some(Box::new(handler));
    }

    pub fn id(&self) -> MonitorId {
        self.core.id
    }

    pub fn bus(&self) -> &Arc<Bus<MonitorId>> {
        &self.bus
    }
}

/// A descendant monitor, activated by a rule action that re-emits an event.
pub struct ChildMonitor {
    core: MonitorCore,
    parent: Monitor,
    root: Arc<RootMonitor>,
}

impl ChildMonitor {
    pub fn parent(&self) -> &Monitor {
        &self.parent
    }
}

/// A handle to either variant of the monitor tree. Cheap to clone (each
/// variant is an `Arc`).
#[derive(Clone)]
pub enum Monitor {
    Root(Arc<RootMonitor>),
    Child(Arc<ChildMonitor>),
}

impl Monitor {
    /// Start a fresh cascade rooted at a new [`RootMonitor`].
    pub fn new_root(priority: i32, scope: RuleScope, bus: Arc<Bus<MonitorId>>) -> Monitor {
        Monitor::Root(RootMonitor::new(priority, scope, bus))
    }

    fn core(&self) -> &MonitorCore {
        match self {
            Monitor::Root(r) => &r.core,
            Monitor::Child(c) => &c.core,
        }
    }

    pub fn root_monitor(&self) -> Arc<RootMonitor> {
        match self {
            Monitor::Root(r) => r.clone(),
            Monitor::Child(c) => c.root.clone(),
        }
    }

    pub fn id(&self) -> MonitorId {
        self.core().id
    }

    pub fn priority(&self) -> i32 {
        self.core().priority
    }

    pub fn is_activated(&self) -> bool {
        self.core().activated.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.core().finished.load(Ordering::SeqCst)
    }

    pub fn event(&self) -> Option<Event> {
        self.core().event.lock().clone()
    }

    pub fn errors(&self) -> Option<ErrorBundle> {
        self.core().errors.lock().clone()
    }

    pub fn context_set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.core().context.lock().insert(key.into(), value);
    }

    pub fn context_get(&self, key: &str) -> Option<serde_json::Value> {
        self.core().context.lock().get(key).cloned()
    }

    /// Create a `ChildMonitor` under this monitor's cascade root, notifying
    /// the root of the new in-flight descendant (§4.D "Creating a child").
    pub fn new_child_monitor(&self, priority: i32) -> Monitor {
        let root = self.root_monitor();
        let child = Arc::new(ChildMonitor {
            core: MonitorCore::new(priority),
            parent: self.clone(),
            root: root.clone(),
        });
        root.descendant_created();
        Monitor::Child(child)
    }

    /// Record the activating event, mark the monitor dispatched, and bump
    /// the root's priority bookkeeping.
    pub fn activate(&self, event: Event) -> Result<(), MonitorStateError> {
        self.check_not_finished_not_activated()?;
        *self.core().event.lock() = Some(event);
        self.core().activated.store(true, Ordering::SeqCst);
        self.core().dispatched.store(true, Ordering::SeqCst);

        let root = self.root_monitor();
        let priority = self.priority();
        let mut agg = root.aggregate.lock();
        let counter = agg.incomplete_by_priority.entry(priority).or_insert(0);
        if *counter == 0 {
            agg.priorities_heap.push(Reverse(priority));
        }
        *counter += 1;
        Ok(())
    }

    /// Record `event` without dispatching it — the monitor never occupies a
    /// priority-counter slot, and `finish` is called immediately.
    pub fn skip(&self, event: Event) -> Result<(), MonitorStateError> {
        self.check_not_finished_not_activated()?;
        *self.core().event.lock() = Some(event);
        self.core().activated.store(true, Ordering::SeqCst);
        self.finish()
    }

    /// Mark the monitor finished. Decrements the root's unfinished count,
    /// and — if the monitor was actually dispatched (not skipped) —
    /// decrements its priority-counter slot. Posts
    /// [`MESSAGE_ROOT_MONITOR_FINISHED`] once the root has no unfinished
    /// descendants left.
    pub fn finish(&self) -> Result<(), MonitorStateError> {
        if !self.is_activated() {
            return Err(MonitorStateError::NotActivated);
        }
        if self.is_finished() {
            return Err(MonitorStateError::AlreadyFinished);
        }
        self.core().finished.store(true, Ordering::SeqCst);

        let root = self.root_monitor();
        let dispatched = self.core().dispatched.load(Ordering::SeqCst);
        let priority = self.priority();
        let cascade_done = {
            let mut agg = root.aggregate.lock();
            agg.unfinished -= 1;
            if dispatched {
                if let Some(counter) = agg.incomplete_by_priority.get_mut(&priority) {
                    *counter -= 1;
                }
            }
            agg.unfinished == 0
        };

        if cascade_done {
            if let Some(handler) = root.finish_handler.lock().take() {
                handler(&root);
            }
            root.bus.post_event(MESSAGE_ROOT_MONITOR_FINISHED, Some(&root.core.id));
        }
        Ok(())
    }

    /// Attach a per-event error bundle to this monitor and fold it into the
    /// root's aggregated error map. Does not itself call `finish`.
    pub fn set_errors(&self, errors: ErrorBundle) {
        *self.core().errors.lock() = Some(errors.clone());
        let root = self.root_monitor();
        root.aggregate.lock().errors.insert(self.id(), errors);
    }

    fn check_not_finished_not_activated(&self) -> Result<(), MonitorStateError> {
        if self.is_finished() {
            return Err(MonitorStateError::AlreadyFinished);
        }
        if self.is_activated() {
            return Err(MonitorStateError::AlreadyActivated);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
