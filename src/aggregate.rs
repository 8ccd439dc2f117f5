//! Aggregation & scoping helpers (C5, §4.5): merges a child validation
//! response into its parent with a provenance prefix, and propagates
//! enforcement-action overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub message: String,
    pub enforcement_action: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub target: TargetRef,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    pub label: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub results: BTreeMap<TargetRef, ValidationResult>,
    pub stats: Vec<StatEntry>,
}

/// Merge every child response into `parent`, target-by-target. Violation
/// messages from a child are prefixed so operators can tell provenance; a
/// target present only in a child is moved wholesale into the parent.
pub fn aggregate(parent_name: &str, parent: &mut ValidationResponse, children: &[ValidationResponse]) {
    let prefix = format!("[mock resource created from expanding {parent_name}]");
    for child in children {
        for (target, result) in &child.results {
            let entry = parent
                .results
                .entry(target.clone())
                .or_insert_with(|| ValidationResult { target: target.clone(), violations: Vec::new() });
            for violation in &result.violations {
                entry.violations.push(Violation {
                    message: format!("{prefix} {}", violation.message),
                    enforcement_action: violation.enforcement_action.clone(),
                });
            }
        }
        parent.stats.push(StatEntry { label: format!("child-stat={parent_name}"), elapsed_ms: 0 });
        parent.stats.extend(child.stats.iter().cloned());
    }
}

/// Rewrite every result's violations to carry `action` when it is
/// non-empty; used when a template supplies an `enforcementAction`
/// override (§4.5).
pub fn override_enforcement_action(action: Option<&str>, response: &mut ValidationResponse) {
    let Some(action) = action.filter(|a| !a.is_empty()) else { return };
    for result in response.results.values_mut() {
        for violation in &mut result.violations {
            violation.enforcement_action = Some(action.to_string());
        }
    }
}
