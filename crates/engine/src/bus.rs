// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic pub/sub bus.
//!
//! Decouples the monitor tree's completion notifications from whoever is
//! listening for them (the task queue, tests, an interpreter-level watcher)
//! without hard-coding a single concrete source type (§4.A). The kernel
//! instantiates this as `Bus<MonitorId>`, but nothing here depends on that.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Sentinel event name: subscribing here observes every `post_event` call.
pub const ANY_EVENT: &str = "";

type Observer<S> = Arc<dyn Fn(&str, Option<&S>) + Send + Sync>;

/// A two-level event-name → source-identity → callback-list registry.
///
/// Generic over the source identity type `S` so one implementation serves
/// every pub/sub need in the kernel.
pub struct Bus<S> {
    observers: Mutex<HashMap<String, HashMap<Option<S>, Vec<Observer<S>>>>>,
}

impl<S> Default for Bus<S> {
    fn default() -> Self {
        Self { observers: Mutex::new(HashMap::new()) }
    }
}

impl<S> Bus<S>
where
    S: Eq + std::hash::Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cb` to run whenever `event` is posted from `source` (or
    /// from any source, if `source` is `None`). A caller may register as
    /// many callbacks as it likes for the same pair.
    pub fn add_observer<F>(&self, event: impl Into<String>, source: Option<S>, cb: F)
    where
        F: Fn(&str, Option<&S>) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .entry(event.into())
            .or_default()
            .entry(source)
            .or_default()
            .push(Arc::new(cb));
    }

    /// Post `event` from `source`. Dispatch proceeds in two sweeps — first
    /// the literal event name, then the wildcard event [`ANY_EVENT`] — and
    /// within each sweep a snapshot of the subscriber list is taken under
    /// the bus lock and invoked with the lock released, so a callback may
    /// freely mutate the bus (the standard idiom is self-removal via a
    /// cloned bus handle) (§4.A).
    pub fn post_event(&self, event: &str, source: Option<&S>) {
        debug_assert!(!event.is_empty(), "post_event requires a non-empty event name");
        self.dispatch_sweep(event, source);
        if event != ANY_EVENT {
            self.dispatch_sweep(ANY_EVENT, source);
        }
    }

    /// Remove observers. Four cases, by which argument is the sentinel
    /// (`""` for `event`, `None` for `source`) (§4.A):
    /// - both sentinel: every observer on the bus.
    /// - `event` only: every observer registered for that event, any source.
    /// - `source` only: every observer registered with that source, any event.
    /// - neither: exactly the observers registered for that `(event, source)` pair.
    pub fn remove_observers(&self, event: &str, source: Option<&S>) {
        let mut observers = self.observers.lock();
        match (event.is_empty(), source) {
            (true, None) => observers.clear(),
            (false, None) => {
                observers.remove(event);
            }
            (true, Some(s)) => {
                observers.retain(|_, by_source| {
                    by_source.remove(&Some(s.clone()));
                    !by_source.is_empty()
                });
            }
            (false, Some(s)) => {
                if let Some(by_source) = observers.get_mut(event) {
                    by_source.remove(&Some(s.clone()));
                    if by_source.is_empty() {
                        observers.remove(event);
                    }
                }
            }
        }
    }

    fn dispatch_sweep(&self, event: &str, source: Option<&S>) {
        let snapshot: Vec<Observer<S>> = {
            let observers = self.observers.lock();
            let Some(by_source) = observers.get(event) else {
                return;
            };
            let mut matched = Vec::new();
            for (registered_source, callbacks) in by_source {
                let applies = match registered_source {
                    None => true,
                    Some(s) => Some(s) == source,
                };
                if applies {
                    matched.extend(callbacks.iter().cloned());
                }
            }
            matched
        };
        for cb in snapshot {
            cb(event, source);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
