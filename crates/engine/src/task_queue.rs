// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue (§4.E).
//!
//! One priority queue per cascade (keyed by root monitor id); `pop` selects
//! a non-empty cascade uniformly at random and returns its lowest-priority
//! task, breaking equal priorities by insertion order. This gives fair,
//! randomized multiplexing across independent cascades while preserving
//! strict priority order *within* each cascade.
//!
//! An empty per-cascade queue is dropped the moment a pop leaves it empty —
//! lazy deletion, the same idiom the monitor tree uses for its stale
//! priority-heap entries (§4.D, §9).

use crate::bus::Bus;
use crate::monitor::{Monitor, MonitorId, MESSAGE_ROOT_MONITOR_FINISHED};
use crate::processor::Processor;
use cascade_core::Event;
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

/// A unit of dispatch: an event to run against a monitor's cascade, plus a
/// handle back to the processor so rule actions can call back into it.
#[derive(Clone)]
pub struct Task {
    pub processor: Processor,
    pub monitor: Monitor,
    pub event: Event,
}

impl Task {
    pub fn new(processor: Processor, monitor: Monitor, event: Event) -> Self {
        Self { processor, monitor, event }
    }

    fn priority(&self) -> i32 {
        self.monitor.priority()
    }
}

struct HeapEntry {
    priority: i32,
    seq: u64,
    task: Task,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// `BinaryHeap` is a max-heap; reverse both fields so the *lowest*
    /// priority (and, within a priority, the *earliest* sequence number)
    /// sorts highest.
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.cmp(&self.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct State {
    cascades: HashMap<MonitorId, BinaryHeap<HeapEntry>>,
}

/// Per-cascade priority queues with fair, randomized multiplexing.
pub struct TaskQueue {
    state: Mutex<State>,
    not_empty: Condvar,
    seq: AtomicU64,
    bus: Arc<Bus<MonitorId>>,
    self_weak: Weak<TaskQueue>,
}

impl TaskQueue {
    /// Construct the queue wired to `bus` — the same bus each cascade's root
    /// monitor posts [`MESSAGE_ROOT_MONITOR_FINISHED`] on, so the queue can
    /// subscribe to each cascade's completion as it starts seeing tasks for
    /// it (§4.E).
    pub fn new(bus: Arc<Bus<MonitorId>>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(State::default()),
            not_empty: Condvar::new(),
            seq: AtomicU64::new(0),
            bus,
            self_weak: weak.clone(),
        })
    }

    /// Insert `task` by its monitor's priority (lower = dequeued earlier);
    /// equal priorities preserve push order via a monotonic sequence number.
    /// On a cascade's first push, subscribe to its root's completion
    /// message so the "no task may outlive its root monitor's completion"
    /// invariant can be asserted (§4.E).
    pub fn push(&self, task: Task) {
        let cascade_id = task.monitor.root_monitor().id();
        let priority = task.priority();
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let is_first_push = {
            let mut state = self.state.lock();
            let is_first_push = !state.cascades.contains_key(&cascade_id);
            state.cascades.entry(cascade_id).or_default().push(HeapEntry { priority, seq, task });
            is_first_push
        };
        if is_first_push {
            self.subscribe_completion_assertion(cascade_id);
        }
        self.not_empty.notify_one();
    }

    /// Subscribe to `cascade_id`'s `MESSAGE_ROOT_MONITOR_FINISHED`: on
    /// firing, assert the cascade's queue is empty and unsubscribe.
    fn subscribe_completion_assertion(&self, cascade_id: MonitorId) {
        let queue = self.self_weak.clone();
        self.bus.add_observer(MESSAGE_ROOT_MONITOR_FINISHED, Some(cascade_id), move |event, source| {
            let Some(queue) = queue.upgrade() else { return };
            let empty = queue.state.lock().cascades.get(&cascade_id).map_or(true, |q| q.is_empty());
            // Internal invariant violation (§7): a root's completion message
            // fires only after every descendant has finished, so its
            // cascade's queue must already be drained.
            debug_assert!(empty, "cascade {cascade_id} finished with tasks still queued");
            if !empty {
                tracing::error!(%cascade_id, "cascade finished with tasks still queued");
            }
            queue.bus.remove_observers(event, source);
        });
    }

    /// Block until a task is available or `should_stop` becomes true while
    /// the queue is empty. Draining always wins over stopping: if tasks
    /// remain, they are returned even after `should_stop` is set.
    pub fn pop(&self, should_stop: &AtomicBool) -> Option<Task> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = Self::try_pop_locked(&mut state) {
                return Some(task);
            }
            if should_stop.load(AtomicOrdering::Relaxed) {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Wake every worker blocked in [`Self::pop`] so they can observe a
    /// newly set stop flag.
    pub fn notify_all(&self) {
        self.not_empty.notify_all();
    }

    fn try_pop_locked(state: &mut State) -> Option<Task> {
        let nonempty: Vec<MonitorId> =
            state.cascades.iter().filter(|(_, q)| !q.is_empty()).map(|(id, _)| *id).collect();
        if nonempty.is_empty() {
            return None;
        }
        let cascade_id = if nonempty.len() == 1 {
            nonempty[0]
        } else {
            nonempty[rand::thread_rng().gen_range(0..nonempty.len())]
        };
        let queue = state.cascades.get_mut(&cascade_id)?;
        let entry = queue.pop()?;
        if queue.is_empty() {
            state.cascades.remove(&cascade_id);
        }
        Some(entry.task)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().cascades.is_empty()
    }

    pub fn cascade_count(&self) -> usize {
        self.state.lock().cascades.len()
    }
}

#[cfg(test)]
#[path = "task_queue_tests.rs"]
mod tests;
