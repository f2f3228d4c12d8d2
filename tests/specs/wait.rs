//! Scenario 6: `add_event_and_wait` on an event no rule's kind-match can
//! ever trigger returns immediately with no monitor created and no
//! completion message posted.

use crate::support::event;
use cascade_engine::{EngineRule, Processor, ProcessorConfig, MESSAGE_ROOT_MONITOR_FINISHED};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn a_non_triggering_event_returns_immediately_with_no_monitor() {
    let processor = Processor::new(ProcessorConfig::default());
    processor
        .add_rule(
            EngineRule::builder()
                .name("only-event1")
                .kind("core.main.event1")
                .scope("data")
                .action(|_, _, _, _| Ok(()))
                .build(),
        )
        .unwrap();

    processor.start();

    // A throwaway root monitor only to reach the processor's shared bus;
    // every monitor the processor creates is wired to the same bus, so
    // subscribing with no source filter catches a finish for any cascade.
    let bus_handle = processor.new_root_monitor(Default::default(), None);
    let observed_finish = Arc::new(AtomicBool::new(false));
    let observed = observed_finish.clone();
    bus_handle
        .root_monitor()
        .bus()
        .add_observer(MESSAGE_ROOT_MONITOR_FINISHED, None, move |_, _| {
            observed.store(true, Ordering::SeqCst);
        });

    let (monitor, err) = processor.add_event_and_wait(event("E", "core.main.event-unknown"), None);
    assert!(monitor.is_none());
    assert!(err.is_none());

    std::thread::sleep(Duration::from_millis(20));
    assert!(!observed_finish.load(Ordering::SeqCst));

    processor.finish();
}
