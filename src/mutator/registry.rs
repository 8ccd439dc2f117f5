//! Mutator registry (C2): the synchronous lock-guarded store of mutators and
//! the `mutate` entry point that applies every match in deterministic order
//! (§4.2, §5.1).

use super::matching;
use super::model::Mutator;
use crate::config::EngineConfig;
use crate::error::{ExpansionError, Result};
use crate::object::Mutable;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Inner {
    mutators: BTreeMap<String, Mutator>,
}

/// Guards all mutators behind a single `RwLock` (§5.1): the matcher and
/// applier never suspend, so a synchronous lock is sufficient and cheaper
/// than an async one.
pub struct MutatorRegistry {
    config: EngineConfig,
    inner: RwLock<Inner>,
}

impl MutatorRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, inner: RwLock::new(Inner { mutators: BTreeMap::new() }) }
    }

    pub fn upsert(&self, mutator: Mutator) -> Result<()> {
        mutator.validate()?;
        if let Some(key) = mutator.invalid_selector_key() {
            let err = ExpansionError::Match {
                id: mutator.id.as_str(),
                message: format!("selector requirement on '{key}' has no candidate values"),
            };
            warn!(mutator_id = %mutator.id.as_str(), error = %err, "mutator has an invalid selector; it will never match");
        }
        let key = mutator.id.as_str();
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.mutators.insert(key, mutator);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.mutators.remove(id);
        Ok(())
    }

    /// All mutators whose match block selects `mutable`, in deterministic
    /// (id-sorted) order — `BTreeMap` iteration is already sorted, so this
    /// is just a filter.
    pub fn mutators_for(&self, mutable: &Mutable) -> Result<Vec<Mutator>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .mutators
            .values()
            .filter(|m| matching::matches(m, mutable, &self.config))
            .cloned()
            .collect())
    }

    /// Apply every matching mutator to `mutable.object` in order, honoring
    /// each mutator's preconditions and checking `token` for cancellation
    /// between steps. Returns whether any mutator actually applied.
    pub fn mutate(&self, mutable: &mut Mutable, token: &CancellationToken) -> Result<bool> {
        let candidates = self.mutators_for(mutable)?;
        let mut mutated = false;
        for mutator in &candidates {
            if token.is_cancelled() {
                return Err(ExpansionError::Cancelled);
            }
            if !super::apply::should_apply(mutator, &mutable.object) {
                debug!(mutator_id = %mutator.id.as_str(), "mutator preconditions unmet, skipping");
                continue;
            }
            super::apply::apply(mutator, &mut mutable.object).map_err(|source| {
                warn!(mutator_id = %mutator.id.as_str(), error = %source, "mutator application failed");
                ExpansionError::Apply {
                    mutator_id: mutator.id.as_str(),
                    generator_id: crate::object::object_name(&mutable.object).to_string(),
                    source: Box::new(source),
                }
            })?;
            mutated = true;
        }
        Ok(mutated)
    }
}

fn poisoned() -> ExpansionError {
    ExpansionError::Shape { message: "mutator registry lock poisoned".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvk::ApplyToTuple;
    use crate::mutator::model::{MatchBlock, MutatorId, MutatorKind};
    use crate::object::{NamespaceInfo, Source};
    use crate::path::parse;
    use serde_json::json;

    fn mutable() -> Mutable {
        Mutable {
            object: json!({"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "p1", "namespace": "ns1"}}),
            namespace: Some(NamespaceInfo { name: "ns1".into(), labels: Default::default() }),
            username: "alice".into(),
            source: Source::Generated,
            operation: None,
        }
    }

    fn mutator(name: &str) -> Mutator {
        Mutator {
            id: MutatorId { kind: "AssignMetadata".into(), namespace: None, name: name.into() },
            apply_to: vec![ApplyToTuple { groups: vec!["".into()], versions: vec!["v1".into()], kinds: vec!["Pod".into()] }],
            operations: vec![],
            match_block: MatchBlock::default(),
            location: parse("metadata.labels.owner").unwrap(),
            kind: MutatorKind::AssignMetadata { value: json!("admin") },
            tests: vec![],
        }
    }

    #[test]
    fn upsert_then_mutate_applies_match() {
        let registry = MutatorRegistry::new(EngineConfig::default());
        registry.upsert(mutator("m1")).unwrap();
        let mut m = mutable();
        let mutated = registry.mutate(&mut m, &CancellationToken::new()).unwrap();
        assert!(mutated);
        assert_eq!(m.object["metadata"]["labels"]["owner"], "admin");
    }

    #[test]
    fn remove_then_mutate_is_noop() {
        let registry = MutatorRegistry::new(EngineConfig::default());
        registry.upsert(mutator("m1")).unwrap();
        registry.remove(&MutatorId { kind: "AssignMetadata".into(), namespace: None, name: "m1".into() }.as_str()).unwrap();
        let mut m = mutable();
        let mutated = registry.mutate(&mut m, &CancellationToken::new()).unwrap();
        assert!(!mutated);
        assert!(m.object["metadata"].get("labels").is_none());
    }

    #[test]
    fn cancellation_token_aborts_before_first_match() {
        let registry = MutatorRegistry::new(EngineConfig::default());
        registry.upsert(mutator("m1")).unwrap();
        let mut m = mutable();
        let token = CancellationToken::new();
        token.cancel();
        let err = registry.mutate(&mut m, &token).unwrap_err();
        assert!(matches!(err, ExpansionError::Cancelled));
    }

    #[test]
    fn upsert_accepts_but_never_matches_invalid_selector() {
        use crate::selector::{LabelSelector, SelectorOperator, SelectorRequirement};

        let registry = MutatorRegistry::new(EngineConfig::default());
        let mut bad_selector = mutator("m1");
        bad_selector.match_block.label_selector = LabelSelector {
            match_labels: Default::default(),
            match_expressions: vec![SelectorRequirement { key: "env".into(), operator: SelectorOperator::In, values: vec![] }],
        };
        registry.upsert(bad_selector).unwrap();

        let mut m = mutable();
        let mutated = registry.mutate(&mut m, &CancellationToken::new()).unwrap();
        assert!(!mutated);
    }

    #[test]
    fn upsert_rejects_invalid_mutator() {
        let registry = MutatorRegistry::new(EngineConfig::default());
        let mut bad = mutator("m1");
        bad.id.name = String::new();
        assert!(registry.upsert(bad).is_err());
    }
}
