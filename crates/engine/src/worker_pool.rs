// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool (§4.F).
//!
//! Parallel OS-thread-level workers, sized once at `start` — no cooperative
//! scheduler, no preemption. Each worker loops popping a [`Task`] off the
//! shared [`TaskQueue`] and running it to completion; blocking inside a rule
//! action ties up that worker for as long as the action runs.

use crate::task_queue::{Task, TaskQueue};
use cascade_core::define_monotonic_id;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

define_monotonic_id! {
    /// Identifies a worker thread for observability only — the kernel never
    /// compares these for ordering.
    pub struct WorkerId;
}

/// A fixed-size pool of OS threads draining a [`TaskQueue`].
pub struct WorkerPool {
    should_stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers, each repeatedly popping from `queue` and
    /// invoking `run` with the popped task and this worker's id.
    pub fn start<F>(count: usize, queue: Arc<TaskQueue>, run: F) -> Self
    where
        F: Fn(Task, WorkerId) + Send + Sync + 'static,
    {
        let should_stop = Arc::new(AtomicBool::new(false));
        let run = Arc::new(run);
        let handles = (0..count.max(1))
            .map(|_| {
                let queue = queue.clone();
                let should_stop = should_stop.clone();
                let run = run.clone();
                std::thread::spawn(move || {
                    tracing::debug!("worker started");
                    while let Some(task) = queue.pop(&should_stop) {
                        // A fresh id per dispatched task, not per worker thread: §4.F
                        // calls for a tid "unique for the lifetime of each dispatched
                        // task" so a tracer/debugger can correlate state per call.
                        let tid = WorkerId::next();
                        run(task, tid);
                    }
                    tracing::debug!("worker drained and stopped");
                })
            })
            .collect();
        Self { should_stop, handles }
    }

    /// Signal every worker to stop once its current task (and any tasks
    /// still queued) finish, wake any worker blocked waiting for work, and
    /// join all threads. There is no in-flight task cancellation (§4.F): a
    /// worker mid-action is not interrupted.
    pub fn stop(self, queue: &TaskQueue) {
        self.should_stop.store(true, Ordering::Relaxed);
        queue.notify_all();
        for handle in self.handles {
            let _ = handle.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
