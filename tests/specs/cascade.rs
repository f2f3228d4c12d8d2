//! Scenario 1: a cascade where one rule suppresses another and re-emits a
//! second event through a child monitor, with `MessageRootMonitorFinished`
//! firing exactly once for the whole cascade.

use crate::support::event;
use cascade_engine::{EngineRule, Processor, ProcessorConfig, MESSAGE_ROOT_MONITOR_FINISHED};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn suppression_and_re_emission_run_to_a_single_completion_signal() {
    let processor = Processor::new(ProcessorConfig::default().worker_count(1));
    let order = Arc::new(Mutex::new(Vec::new()));
    let finish_count = Arc::new(AtomicUsize::new(0));

    let order_r1 = order.clone();
    let r1 = EngineRule::builder()
        .name("R1")
        .kind("core.main.event1")
        .scope("data")
        .priority(2)
        .suppresses("R3")
        .action(move |processor, monitor, _event, _tid| {
            order_r1.lock().push("R1");
            let child = monitor.new_child_monitor(1);
            processor.add_event(event("X", "core.main.event2"), Some(child));
            Ok(())
        })
        .build();

    let order_r2 = order.clone();
    let r2 = EngineRule::builder()
        .name("R2")
        .kind("core.main.*")
        .scope("data")
        .priority(5)
        .action(move |_, _, _, _| {
            order_r2.lock().push("R2");
            Ok(())
        })
        .build();

    let order_r3 = order.clone();
    let r3 = EngineRule::builder()
        .name("R3")
        .kind("core.main.*")
        .scope("data")
        .priority(0)
        .action(move |_, _, _, _| {
            order_r3.lock().push("R3");
            Ok(())
        })
        .build();

    processor.add_rule(r1).unwrap();
    processor.add_rule(r2).unwrap();
    processor.add_rule(r3).unwrap();

    let finish_count_observer = finish_count.clone();
    let bus_monitor = processor.new_root_monitor(Default::default(), None);
    let root_id = bus_monitor.root_monitor().id();
    bus_monitor.root_monitor().bus().add_observer(MESSAGE_ROOT_MONITOR_FINISHED, Some(root_id), move |_, _| {
        finish_count_observer.fetch_add(1, Ordering::SeqCst);
    });

    processor.start();
    let (monitor, _) = processor.add_event_and_wait(event("E", "core.main.event1"), Some(bus_monitor));
    assert!(monitor.unwrap().is_finished());

    assert_eq!(*order.lock(), vec!["R1", "R2", "R3", "R2"]);
    assert_eq!(finish_count.load(Ordering::SeqCst), 1);

    processor.finish();
}
