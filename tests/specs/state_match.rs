//! Scenario 4: state-match rules combining `AnyPresent` and `Regex`
//! matchers, including the fail-closed behavior when a required key is
//! absent from the event entirely.

use cascade_core::{Event, StateMatcher};
use cascade_engine::{EngineRule, Processor, ProcessorConfig};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn matched_event(name: &str, state: &[(&str, &str)]) -> Event {
    let mut builder = Event::builder().name(name).dotted_kind("core.main.tester");
    for (key, value) in state {
        builder = builder.state_entry(*key, *value);
    }
    builder.build()
}

fn processor_with_t1_and_t2(matched: Arc<Mutex<HashSet<&'static str>>>) -> Processor {
    let processor = Processor::new(ProcessorConfig::default());

    let matched_t1 = matched.clone();
    processor
        .add_rule(
            EngineRule::builder()
                .name("T1")
                .kind("core.main.tester")
                .scope("data")
                .state("name", StateMatcher::AnyPresent)
                .state("test", StateMatcher::Regex(Regex::new("^val.*").unwrap()))
                .action(move |_, _, _, _| {
                    matched_t1.lock().unwrap().insert("T1");
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let matched_t2 = matched.clone();
    processor
        .add_rule(
            EngineRule::builder()
                .name("T2")
                .kind("core.main.tester")
                .scope("data")
                .state("name", StateMatcher::AnyPresent)
                .state("test", StateMatcher::Regex(Regex::new("^va..*").unwrap()))
                .action(move |_, _, _, _| {
                    matched_t2.lock().unwrap().insert("T2");
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    processor.start();
    processor
}

#[test]
fn both_regexes_match_a_value_starting_with_val() {
    let matched = Arc::new(Mutex::new(HashSet::new()));
    let processor = processor_with_t1_and_t2(matched.clone());

    let (monitor, _) =
        processor.add_event_and_wait(matched_event("E", &[("name", "x"), ("test", "val")]), None);
    assert!(monitor.unwrap().is_finished());
    assert_eq!(*matched.lock().unwrap(), HashSet::from(["T1", "T2"]));
    processor.finish();
}

#[test]
fn only_the_looser_regex_matches_a_value_that_does_not_start_with_val() {
    let matched = Arc::new(Mutex::new(HashSet::new()));
    let processor = processor_with_t1_and_t2(matched.clone());

    let (monitor, _) =
        processor.add_event_and_wait(matched_event("E", &[("name", "x"), ("test", "var")]), None);
    assert!(monitor.unwrap().is_finished());
    assert_eq!(*matched.lock().unwrap(), HashSet::from(["T2"]));
    processor.finish();
}

#[test]
fn a_missing_required_key_matches_neither_rule() {
    let matched = Arc::new(Mutex::new(HashSet::new()));
    let processor = processor_with_t1_and_t2(matched.clone());

    let (monitor, _) = processor.add_event_and_wait(matched_event("E", &[("test", "val")]), None);
    assert!(monitor.unwrap().is_finished());
    assert!(matched.lock().unwrap().is_empty());
    processor.finish();
}

