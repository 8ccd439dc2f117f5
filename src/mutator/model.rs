//! Mutator data model (§3): the polymorphic {assign-field, assign-metadata,
//! assign-image, modify-set} family, its match block, and the invariants
//! checked at construction time.

use crate::error::{ExpansionError, Result};
use crate::gvk::ApplyToTuple;
use crate::object::Source;
use crate::path::ast::{ListSelector, PathNode};
use crate::path::{Path, PathTest};
use crate::selector::LabelSelector;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorId {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl MutatorId {
    pub fn as_str(&self) -> String {
        format!("{}/{}/{}", self.kind, self.namespace.as_deref().unwrap_or(""), self.name)
    }
}

/// Whether a mutator/template's match block applies to cluster-scoped or
/// namespace-scoped objects. Namespace objects themselves are treated as
/// cluster-scoped (§4.2d).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Cluster,
    Namespaced,
}

/// Which provenance a mutator fires on (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    Original,
    Generated,
    All,
}

impl SourceFilter {
    pub fn matches(&self, source: Source) -> bool {
        match (self, source) {
            (SourceFilter::All, _) => true,
            (SourceFilter::Original, Source::Original) => true,
            (SourceFilter::Generated, Source::Generated) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationToken {
    Create,
    Update,
    Delete,
    Connect,
    Any,
}

/// Empty means "all operations" (§4.2).
pub type OperationFilter = Vec<OperationToken>;

#[derive(Debug, Clone)]
pub struct MatchBlock {
    pub scope: Scope,
    pub namespaces: Vec<String>,
    pub excluded_namespaces: Vec<String>,
    pub label_selector: LabelSelector,
    pub namespace_selector: LabelSelector,
    pub name_glob: Option<String>,
    pub source: SourceFilter,
}

impl Default for MatchBlock {
    fn default() -> Self {
        Self {
            scope: Scope::Namespaced,
            namespaces: Vec::new(),
            excluded_namespaces: Vec::new(),
            label_selector: LabelSelector::default(),
            namespace_selector: LabelSelector::default(),
            name_glob: None,
            source: SourceFilter::All,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MutatorKind {
    AssignField { value: Value },
    /// Restricted to `metadata.labels.*`/`metadata.annotations.*`; sets only
    /// if absent (enforced via an implicit `MustNotExist` test, §4.2).
    AssignMetadata { value: Value },
    AssignImage {
        new_name: Option<String>,
        new_tag: Option<String>,
        new_digest: Option<String>,
    },
    ModifySet { merge: Vec<String>, prune: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Mutator {
    pub id: MutatorId,
    pub apply_to: Vec<ApplyToTuple>,
    pub operations: OperationFilter,
    pub match_block: MatchBlock,
    pub location: Path,
    pub kind: MutatorKind,
    pub tests: Vec<PathTest>,
}

impl Mutator {
    /// §3 invariants checked at upsert time (shape errors).
    pub fn validate(&self) -> Result<()> {
        if self.id.name.is_empty() {
            return Err(shape("mutator name must not be empty"));
        }
        if self.apply_to.is_empty() {
            return Err(shape("mutator must have at least one applyTo tuple"));
        }

        if matches!(self.kind, MutatorKind::AssignMetadata { .. }) {
            self.validate_assign_metadata_location()?;
        }

        if let PathNode::List { key_field, selector: ListSelector::Key(key_value), .. } = self.location.terminal() {
            self.validate_keyed_append(key_field, key_value)?;
        }

        Ok(())
    }

    /// A malformed `matchExpressions` entry (§7 Match errors) doesn't reject
    /// the mutator outright — it's created, but permanently fails to match.
    pub fn invalid_selector_key(&self) -> Option<&str> {
        self.match_block
            .label_selector
            .invalid_requirement()
            .or_else(|| self.match_block.namespace_selector.invalid_requirement())
    }

    fn validate_assign_metadata_location(&self) -> Result<()> {
        let nodes = &self.location.nodes;
        let ok = nodes.len() == 3
            && matches!(&nodes[0], PathNode::Object { field } if field == "metadata")
            && matches!(&nodes[1], PathNode::Object { field } if field == "labels" || field == "annotations")
            && matches!(&nodes[2], PathNode::Object { .. });
        if !ok {
            return Err(shape(&format!(
                "assign-metadata location '{}' must be metadata.labels.<key> or metadata.annotations.<key>",
                self.location.as_str_repr()
            )));
        }
        Ok(())
    }

    fn validate_keyed_append(&self, key_field: &str, key_value: &str) -> Result<()> {
        let MutatorKind::AssignField { value } = &self.kind else {
            return Err(shape("only assign-field mutators may terminate on a keyed list node"));
        };
        let Some(obj) = value.as_object() else {
            return Err(shape("list-appending mutations must supply a key-matching object"));
        };
        if let Some(existing) = obj.get(key_field).and_then(Value::as_str) {
            if existing != key_value {
                return Err(shape(&format!(
                    "list-appending value's '{key_field}' ('{existing}') does not match the path key ('{key_value}')"
                )));
            }
        }
        Ok(())
    }
}

fn shape(message: &str) -> ExpansionError {
    ExpansionError::Shape { message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse;
    use serde_json::json;

    fn base_mutator(kind: MutatorKind, location: &str) -> Mutator {
        Mutator {
            id: MutatorId { kind: "AssignField".into(), namespace: None, name: "m1".into() },
            apply_to: vec![ApplyToTuple { groups: vec!["".into()], versions: vec!["v1".into()], kinds: vec!["Pod".into()] }],
            operations: vec![],
            match_block: MatchBlock::default(),
            location: parse(location).unwrap(),
            kind,
            tests: vec![],
        }
    }

    #[test]
    fn rejects_empty_name() {
        let mut m = base_mutator(MutatorKind::AssignField { value: json!("x") }, "spec.replicas");
        m.id.name = String::new();
        assert!(m.validate().is_err());
    }

    #[test]
    fn assign_metadata_rejects_non_metadata_location() {
        let m = base_mutator(MutatorKind::AssignMetadata { value: json!("x") }, "spec.replicas");
        assert!(m.validate().is_err());
    }

    #[test]
    fn assign_metadata_accepts_labels_location() {
        let m = base_mutator(MutatorKind::AssignMetadata { value: json!("admin") }, "metadata.labels.owner");
        assert!(m.validate().is_ok());
    }

    #[test]
    fn keyed_append_requires_matching_key_field() {
        let m = base_mutator(
            MutatorKind::AssignField { value: json!({"name": "wrong", "image": "x"}) },
            "spec.containers[name:nginx]",
        );
        assert!(m.validate().is_err());
    }

    #[test]
    fn in_operator_with_no_values_is_flagged_invalid_but_still_constructs() {
        use crate::selector::{LabelSelector, SelectorOperator, SelectorRequirement};

        let mut m = base_mutator(MutatorKind::AssignMetadata { value: json!("admin") }, "metadata.labels.owner");
        m.match_block.label_selector = LabelSelector {
            match_labels: Default::default(),
            match_expressions: vec![SelectorRequirement { key: "env".into(), operator: SelectorOperator::In, values: vec![] }],
        };
        assert!(m.validate().is_ok());
        assert_eq!(m.invalid_selector_key(), Some("env"));
    }

    #[test]
    fn keyed_append_accepts_matching_or_absent_key_field() {
        let m = base_mutator(
            MutatorKind::AssignField { value: json!({"image": "x"}) },
            "spec.containers[name:nginx]",
        );
        assert!(m.validate().is_ok());
    }
}
