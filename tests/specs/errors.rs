//! Scenario 5: with `fail_on_first_error` left at its default (`false`),
//! every matched rule still runs even after earlier ones fail, and the
//! root monitor aggregates every failure keyed by rule name.

use crate::support::event;
use cascade_core::ActionError;
use cascade_engine::{EngineRule, Processor, ProcessorConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn failures_from_multiple_rules_are_aggregated_and_every_rule_still_runs() {
    let processor = Processor::new(ProcessorConfig::default());
    let ran = Arc::new(AtomicUsize::new(0));

    let ran_a = ran.clone();
    let failing_a = EngineRule::builder()
        .name("fails-a")
        .kind("core.main.*")
        .scope("data")
        .priority(0)
        .action(move |_, _, _, _| {
            ran_a.fetch_add(1, Ordering::SeqCst);
            Err(ActionError::msg("a failed"))
        })
        .build();

    let ran_b = ran.clone();
    let passing = EngineRule::builder()
        .name("passes")
        .kind("core.main.*")
        .scope("data")
        .priority(1)
        .action(move |_, _, _, _| {
            ran_b.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    let ran_c = ran.clone();
    let failing_b = EngineRule::builder()
        .name("fails-b")
        .kind("core.main.*")
        .scope("data")
        .priority(2)
        .action(move |_, _, _, _| {
            ran_c.fetch_add(1, Ordering::SeqCst);
            Err(ActionError::msg("b failed"))
        })
        .build();

    processor.add_rule(failing_a).unwrap();
    processor.add_rule(passing).unwrap();
    processor.add_rule(failing_b).unwrap();
    processor.start();

    let (monitor, _) = processor.add_event_and_wait(event("E", "core.main.event1"), None);
    let monitor = monitor.unwrap();
    assert!(monitor.is_finished());

    assert_eq!(ran.load(Ordering::SeqCst), 3, "every matched rule runs despite earlier failures");

    let errors = monitor.errors().expect("both failing rules should be recorded");
    assert_eq!(errors.len(), 2);
    assert!(errors.contains_key("fails-a"));
    assert!(errors.contains_key("fails-b"));
    assert!(!errors.contains_key("passes"));

    processor.finish();
}
