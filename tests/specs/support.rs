//! Shared helpers for the end-to-end specs.

use cascade_core::Event;
use std::time::Duration;

pub fn event(name: &str, kind: &str) -> Event {
    Event::builder().name(name).dotted_kind(kind).build()
}

/// Poll `check` until it's true or the budget runs out, panicking on timeout.
/// Cascades in these specs are pure in-memory dispatch, so a second is a
/// generous ceiling even on a loaded CI box.
pub fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition did not become true within 1s");
}
