//! Scenario 2: priority ordering across concurrently dispatched cascades.

use crate::support::{event, wait_for};
use cascade_engine::{EngineRule, Processor, ProcessorConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn highest_priority_tracks_activated_descendants_and_clears_once_they_drain() {
    let processor = Processor::new(ProcessorConfig::default().worker_count(2));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let in_flight_rule = in_flight.clone();

    processor
        .add_rule(
            EngineRule::builder()
                .name("slow")
                .kind("core.main.event1")
                .kind("core.main.event2")
                .scope("data")
                .action(move |_, _, _, _| {
                    in_flight_rule.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(80));
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    processor.start();

    let root = processor.new_root_monitor(Default::default(), None);

    // Three cascades at priority 3, one at priority 5 — all dispatched
    // through children of a single shared root so they share the same
    // aggregate priority bookkeeping.
    let mut monitors = Vec::new();
    for _ in 0..3 {
        let child = root.new_child_monitor(3);
        monitors.push(child.clone());
        processor.add_event(event("E1", "core.main.event1"), Some(child));
    }
    let fifth = root.new_child_monitor(5);
    monitors.push(fifth.clone());
    processor.add_event(event("E2", "core.main.event2"), Some(fifth));

    wait_for(|| in_flight.load(Ordering::SeqCst) >= 1);
    assert_eq!(root.root_monitor().highest_priority(), Some(3));

    for monitor in &monitors {
        wait_for(|| monitor.is_finished());
    }
    assert_eq!(root.root_monitor().highest_priority(), None);

    processor.finish();
}
