// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope ACL.
//!
//! A [`RuleScope`] is a trie over dot-separated path segments. Each node
//! carries an optional `allowed` flag; the deepest flag seen while walking a
//! path decides the answer, with the ancestor's flag inherited wherever a
//! descendant doesn't override it (§4.B).

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct ScopeNode {
    allowed: Option<bool>,
    children: HashMap<String, ScopeNode>,
}

/// A hierarchical ACL attached to a cascade.
#[derive(Debug, Default, Clone)]
pub struct RuleScope {
    root: ScopeNode,
}

impl RuleScope {
    /// An empty scope: every path is denied unless explicitly set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that allows every path — the default for a root monitor
    /// created without an explicit scope (§4.G step 3).
    pub fn allow_all() -> Self {
        let mut scope = Self::new();
        scope.set("", true);
        scope
    }

    /// Set the `allowed` flag at `path` (`""` sets the global default).
    pub fn set(&mut self, path: &str, allowed: bool) {
        let mut node = &mut self.root;
        if !path.is_empty() {
            for segment in path.split('.') {
                node = node.children.entry(segment.to_string()).or_default();
            }
        }
        node.allowed = Some(allowed);
    }

    /// Walk `path` segment by segment; the deepest `allowed` flag encountered
    /// wins, inherited by descendants that don't override it. Absence of a
    /// path node below the current walk terminates early on the last-seen
    /// flag. Default is deny.
    pub fn is_allowed(&self, path: &str) -> bool {
        let mut node = &self.root;
        let mut answer = node.allowed;
        if !path.is_empty() {
            for segment in path.split('.') {
                match node.children.get(segment) {
                    Some(child) => {
                        node = child;
                        if let Some(flag) = node.allowed {
                            answer = Some(flag);
                        }
                    }
                    None => break,
                }
            }
        }
        answer.unwrap_or(false)
    }

    /// Short-circuits on the first denial.
    pub fn is_allowed_all<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> bool {
        paths.into_iter().all(|p| self.is_allowed(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_denies_everything() {
        let scope = RuleScope::new();
        assert!(!scope.is_allowed("data"));
        assert!(!scope.is_allowed(""));
    }

    #[test]
    fn allow_all_allows_everything() {
        let scope = RuleScope::allow_all();
        assert!(scope.is_allowed("data.write"));
        assert!(scope.is_allowed("anything.at.all"));
    }

    #[test]
    fn deepest_flag_on_the_path_wins() {
        // Scenario 3: data=true, data.read=true, data.write=false.
        let mut scope = RuleScope::new();
        scope.set("data", true);
        scope.set("data.read", true);
        scope.set("data.write", false);

        assert!(scope.is_allowed("data"));
        assert!(scope.is_allowed("data.read"));
        assert!(!scope.is_allowed("data.write"));
    }

    #[test]
    fn missing_descendant_inherits_ancestor_flag() {
        let mut scope = RuleScope::new();
        scope.set("data", true);
        // No node for "data.read.extra" — last seen flag (data=true) wins.
        assert!(scope.is_allowed("data.read.extra"));
    }

    #[test]
    fn is_allowed_all_short_circuits_on_first_denial() {
        let mut scope = RuleScope::new();
        scope.set("data", true);
        scope.set("data.write", false);
        assert!(!scope.is_allowed_all(["data.read", "data.write"]));
        assert!(scope.is_allowed_all(["data.read", "data"]));
    }
}
