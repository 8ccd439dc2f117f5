//! Group/Version/Kind identifiers and the `applyTo` cross-product (§3.1).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single Group/Version/Kind tuple — the unit both templates and mutators
/// match against. The core API group is represented as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.version.is_empty() && self.kind.is_empty()
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// One `applyTo` tuple: `{groups[], versions[], kinds[]}`. The cross-product
/// of the three lists enumerates the GVKs this tuple matches. An empty list
/// in any position means "match none" (§4.2) — this is intentionally
/// asymmetric with the empty-operation-filter convention used elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyToTuple {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
}

impl ApplyToTuple {
    /// Expand this tuple into the GVKs it matches (the cross-product).
    /// Empty in any position yields no GVKs at all.
    pub fn flatten(&self) -> Vec<Gvk> {
        if self.groups.is_empty() || self.versions.is_empty() || self.kinds.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.groups.len() * self.versions.len() * self.kinds.len());
        for group in &self.groups {
            for version in &self.versions {
                for kind in &self.kinds {
                    out.push(Gvk::new(group.clone(), version.clone(), kind.clone()));
                }
            }
        }
        out
    }

    pub fn matches(&self, gvk: &Gvk) -> bool {
        self.groups.iter().any(|g| g == &gvk.group)
            && self.versions.iter().any(|v| v == &gvk.version)
            && self.kinds.iter().any(|k| k == &gvk.kind)
    }
}

/// Flatten a whole `applyTo` list (several tuples) into the union of GVKs it
/// matches.
pub fn flatten_apply_to(apply_to: &[ApplyToTuple]) -> Vec<Gvk> {
    let mut out = Vec::new();
    for tuple in apply_to {
        out.extend(tuple.flatten());
    }
    out
}

pub fn apply_to_matches(apply_to: &[ApplyToTuple], gvk: &Gvk) -> bool {
    apply_to.iter().any(|tuple| tuple.matches(gvk))
}
