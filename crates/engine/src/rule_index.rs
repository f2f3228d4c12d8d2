// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-stage rule matcher (§4.C).
//!
//! A three-level structure: a trie over kind-path segments (literal children
//! plus one shared wildcard child per node — a reused subtree rather than a
//! list of parallel sub-indexes, see DESIGN.md), terminating at each
//! kind-path's depth in an `AllMatch` leaf (rules with no `state_match`) and
//! a `StateMatch` leaf (rules with one, bitmask-matched against the event).
//!
//! `is_triggering` only walks the trie — kind-only, ignoring state entirely.
//! `match_event` walks the same trie and additionally evaluates every
//! `StateMatch` leaf's bitmask against the event's state.

use cascade_core::{Event, Rule, StateValue};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("rule name {0:?} is already registered in the rule index")]
    DuplicateName(String),

    #[error("state-match leaf already holds the maximum of 64 rules; rule {0:?} cannot be added")]
    StateLeafFull(String),
}

#[derive(Default)]
struct KeyMatchers {
    /// Bit set for every rule whose `state_match` constrains this key at all.
    required_mask: u64,
    /// Bit set for rules whose matcher for this key is `AnyPresent`.
    any_present_mask: u64,
    /// Value → bitmask of rules whose matcher for this key is `Equals(value)`.
    equals_map: HashMap<StateValue, u64>,
    /// Compiled pattern + bitmask of rules whose matcher for this key is `Regex`.
    regex_rules: Vec<(Regex, u64)>,
}

struct StateLeaf<P, M> {
    rules: Vec<Arc<Rule<P, M>>>,
    per_key: HashMap<String, KeyMatchers>,
}

impl<P, M> Default for StateLeaf<P, M> {
    fn default() -> Self {
        Self { rules: Vec::new(), per_key: HashMap::new() }
    }
}

impl<P, M> StateLeaf<P, M> {
    fn add(&mut self, rule: Arc<Rule<P, M>>) -> Result<(), IndexError> {
        if self.rules.len() >= 64 {
            return Err(IndexError::StateLeafFull(rule.name.clone()));
        }
        let bit = self.rules.len() as u32;
        let mask = 1u64 << bit;
        for (key, matcher) in &rule.state_match {
            let km = self.per_key.entry(key.clone()).or_default();
            km.required_mask |= mask;
            use cascade_core::StateMatcher::*;
            match matcher {
                AnyPresent => km.any_present_mask |= mask,
                Equals(v) => *km.equals_map.entry(v.clone()).or_insert(0) |= mask,
                Regex(re) => km.regex_rules.push((re.clone(), mask)),
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Bitmask-evaluate every registered key against `event`, per key:
    /// `result &= satisfied_for_key | !required_mask_for_key` — a rule that
    /// doesn't constrain a key passes it trivially.
    fn match_event(&self, event: &Event) -> Vec<Arc<Rule<P, M>>> {
        let n = self.rules.len();
        if n == 0 {
            return Vec::new();
        }
        let universe: u64 = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
        let mut result = universe;
        for (key, km) in &self.per_key {
            let satisfied = match event.state.get(key) {
                None => 0u64,
                Some(v) => {
                    let mut s = km.any_present_mask;
                    if let Some(&m) = km.equals_map.get(v) {
                        s |= m;
                    }
                    let text = v.to_string();
                    for (re, m) in &km.regex_rules {
                        if re.is_match(&text) {
                            s |= m;
                        }
                    }
                    s
                }
            };
            result &= satisfied | !km.required_mask;
            if result == 0 {
                break;
            }
        }
        (0..n)
            .filter(|i| result & (1 << i) != 0)
            .map(|i| self.rules[i].clone())
            .collect()
    }
}

struct KindNode<P, M> {
    literal: HashMap<String, Box<KindNode<P, M>>>,
    wildcard: Option<Box<KindNode<P, M>>>,
    all_match: Vec<Arc<Rule<P, M>>>,
    state_leaf: StateLeaf<P, M>,
}

impl<P, M> Default for KindNode<P, M> {
    fn default() -> Self {
        Self {
            literal: HashMap::new(),
            wildcard: None,
            all_match: Vec::new(),
            state_leaf: StateLeaf::default(),
        }
    }
}

impl<P, M> KindNode<P, M> {
    fn get_or_create(&mut self, segments: &[String]) -> &mut KindNode<P, M> {
        match segments.split_first() {
            None => self,
            Some((seg, rest)) if seg == "*" => {
                self.wildcard.get_or_insert_with(|| Box::new(KindNode::default())).get_or_create(rest)
            }
            Some((seg, rest)) => self
                .literal
                .entry(seg.clone())
                .or_insert_with(|| Box::new(KindNode::default()))
                .get_or_create(rest),
        }
    }

    fn insert_rule(&mut self, rule: Arc<Rule<P, M>>) -> Result<(), IndexError> {
        if rule.state_match.is_empty() {
            self.all_match.push(rule);
            Ok(())
        } else {
            self.state_leaf.add(rule)
        }
    }

    /// Walk `segments`, matching a literal child first and the wildcard
    /// child in addition (a literal and a wildcard may both lead to rules
    /// for the same event — a rule registered under `core.main.*` and one
    /// under `core.main.event1` both apply to event kind `core.main.event1`).
    fn collect_terminals<'a>(&'a self, segments: &[String], out: &mut Vec<&'a KindNode<P, M>>) {
        match segments.split_first() {
            None => out.push(self),
            Some((seg, rest)) => {
                if let Some(child) = self.literal.get(seg) {
                    child.collect_terminals(rest, out);
                }
                if let Some(child) = &self.wildcard {
                    child.collect_terminals(rest, out);
                }
            }
        }
    }

    fn has_rules(&self) -> bool {
        !self.all_match.is_empty() || !self.state_leaf.rules.is_empty()
    }
}

/// Holds every registered rule, indexed for the two-stage match described
/// above.
pub struct RuleIndex<P, M> {
    root: KindNode<P, M>,
    names: HashSet<String>,
}

impl<P, M> Default for RuleIndex<P, M> {
    fn default() -> Self {
        Self { root: KindNode::default(), names: HashSet::new() }
    }
}

impl<P, M> RuleIndex<P, M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule` under every one of its `kind_match` paths. A rule with
    /// N kind-paths is inserted N times (§4.C invariants). Rule names must
    /// be unique across the whole index.
    pub fn add_rule(&mut self, rule: Rule<P, M>) -> Result<(), IndexError> {
        if self.names.contains(&rule.name) {
            return Err(IndexError::DuplicateName(rule.name));
        }
        let rule = Arc::new(rule);
        for path in rule.kind_match.clone() {
            self.root.get_or_create(&path).insert_rule(rule.clone())?;
        }
        self.names.insert(rule.name.clone());
        Ok(())
    }

    /// Stage one: does any registered rule's kind-path match `event.kind`,
    /// regardless of state? O(depth) trie walk, no bitmask evaluation.
    pub fn is_triggering(&self, event: &Event) -> bool {
        let mut nodes = Vec::new();
        self.root.collect_terminals(&event.kind, &mut nodes);
        nodes.iter().any(|n| n.has_rules())
    }

    /// Stage two: the full set of rules whose kind-path matches `event.kind`
    /// AND whose `state_match` is satisfied by `event.state`. Rules matched
    /// via more than one terminal node (distinct kind-paths for the same
    /// rule, both matching this event) appear once.
    pub fn match_event(&self, event: &Event) -> Vec<Arc<Rule<P, M>>> {
        let mut nodes = Vec::new();
        self.root.collect_terminals(&event.kind, &mut nodes);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for node in nodes {
            for rule in &node.all_match {
                if seen.insert(rule.name.clone()) {
                    out.push(rule.clone());
                }
            }
            for rule in node.state_leaf.match_event(event) {
                if seen.insert(rule.name.clone()) {
                    out.push(rule.clone());
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
#[path = "rule_index_tests.rs"]
mod tests;
