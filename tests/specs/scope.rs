//! Scenario 3: scope gating restricts which rules may run under a given
//! root monitor, independent of whether their kind-path matches.

use crate::support::event;
use cascade_core::RuleScope;
use cascade_engine::{EngineRule, Processor, ProcessorConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn only_the_rule_whose_scope_is_allowed_runs() {
    let processor = Processor::new(ProcessorConfig::default());

    let s1_ran = Arc::new(AtomicBool::new(false));
    let s1_ran2 = s1_ran.clone();
    let s1 = EngineRule::builder()
        .name("S1")
        .kind("core.main.*")
        .scope("data.write")
        .action(move |_, _, _, _| {
            s1_ran2.store(true, Ordering::SeqCst);
            Ok(())
        })
        .build();

    let s2_ran = Arc::new(AtomicBool::new(false));
    let s2_ran2 = s2_ran.clone();
    let s2 = EngineRule::builder()
        .name("S2")
        .kind("core.main.*")
        .scope("data")
        .action(move |_, _, _, _| {
            s2_ran2.store(true, Ordering::SeqCst);
            Ok(())
        })
        .build();

    processor.add_rule(s1).unwrap();
    processor.add_rule(s2).unwrap();
    processor.start();

    let mut root_scope = RuleScope::new();
    root_scope.set("data", true);
    root_scope.set("data.read", true);
    root_scope.set("data.write", false);
    let root = processor.new_root_monitor(Default::default(), Some(root_scope));

    let (monitor, _) = processor.add_event_and_wait(event("E", "core.main.event1"), Some(root));
    assert!(monitor.unwrap().is_finished());

    assert!(!s1_ran.load(Ordering::SeqCst), "S1 is scoped to data.write, which is denied");
    assert!(s2_ran.load(Ordering::SeqCst), "S2 is scoped to data, which is allowed");

    processor.finish();
}
