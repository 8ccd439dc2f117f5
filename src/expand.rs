//! Expansion system (C4, §4.4): recursively expands a generator object
//! against every matching template, depth-first, applying each resultant's
//! mutators before it becomes the next recursion's generator.

use crate::config::EngineConfig;
use crate::error::{ExpansionError, Result};
use crate::mutator::MutatorRegistry;
use crate::object::{ensure_owner_reference, nested_map, object_gvk, set_gvk, Mutable, Resultant};
use crate::template::{ExpansionTemplate, TemplateDb};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub struct ExpansionSystem {
    templates: TemplateDb,
    mutators: MutatorRegistry,
}

impl ExpansionSystem {
    pub fn new(config: EngineConfig) -> Self {
        Self { templates: TemplateDb::new(config.clone()), mutators: MutatorRegistry::new(config) }
    }

    pub fn upsert_template(&self, template: ExpansionTemplate) -> Result<()> {
        self.templates.upsert(template)
    }

    pub fn remove_template(&self, name: &str) -> Result<()> {
        self.templates.remove(name)
    }

    pub fn upsert_mutator(&self, mutator: crate::mutator::Mutator) -> Result<()> {
        self.mutators.upsert(mutator)
    }

    pub fn remove_mutator(&self, id: &str) -> Result<()> {
        self.mutators.remove(id)
    }

    /// Expand `mutable` against every matching template, recursively.
    /// Mutators never run on `mutable` itself here — only on the resultants
    /// `expand_one` produces — so a source-generated mutator can't re-fire
    /// on the original admission object it was meant to leave alone.
    #[instrument(skip(self, mutable, token), fields(gvk = %object_gvk(&mutable.object)))]
    pub fn expand(&self, mutable: &mut Mutable, token: &CancellationToken) -> Result<Vec<Resultant>> {
        if token.is_cancelled() {
            return Err(ExpansionError::Cancelled);
        }

        let generator_gvk = object_gvk(&mutable.object);
        if generator_gvk.is_empty() {
            return Err(ExpansionError::Shape { message: "generator has no apiVersion/kind".into() });
        }
        let templates = self.templates.templates_for(&generator_gvk)?;

        let mut results = Vec::new();
        for template in &templates {
            if token.is_cancelled() {
                return Err(ExpansionError::Cancelled);
            }
            results.extend(self.expand_one(template, mutable, token)?);
        }
        Ok(results)
    }

    fn expand_one(&self, template: &ExpansionTemplate, generator: &Mutable, token: &CancellationToken) -> Result<Vec<Resultant>> {
        let source = nested_map(&generator.object, &template.template_source).ok_or_else(|| {
            ExpansionError::MissingSource {
                template: template.name.clone(),
                path: template.template_source.clone(),
                generator_id: crate::object::object_name(&generator.object).to_string(),
            }
        })?;

        let mut resultant_object = source.clone();
        set_gvk(&mut resultant_object, &template.generated_gvk);
        ensure_owner_reference(&mut resultant_object, &generator.object);

        let mut resultant_mutable = Mutable {
            object: resultant_object,
            namespace: generator.namespace.clone(),
            username: generator.username.clone(),
            source: crate::object::Source::Generated,
            operation: generator.operation,
        };

        self.mutators.mutate(&mut resultant_mutable, token)?;

        debug!(template = %template.name, "expanded resultant");

        let mut children = self.expand(&mut resultant_mutable, token)?;

        let mut out = vec![Resultant {
            object: resultant_mutable.object,
            old_object: None,
            template_name: template.name.clone(),
            enforcement_action: template.enforcement_action.clone(),
        }];
        out.append(&mut children);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvk::{ApplyToTuple, Gvk};
    use crate::mutator::model::{MatchBlock, Mutator, MutatorId, MutatorKind};
    use crate::object::{NamespaceInfo, Source};
    use crate::path::parse;
    use serde_json::json;

    fn deployment() -> Mutable {
        Mutable {
            object: json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": "nginx-dep", "namespace": "ns1"},
                "spec": {"template": {"metadata": {"labels": {"app": "nginx"}}, "spec": {"containers": [{"name": "nginx", "image": "nginx:1.0"}]}}},
            }),
            namespace: Some(NamespaceInfo { name: "ns1".into(), labels: Default::default() }),
            username: "alice".into(),
            source: Source::Original,
            operation: None,
        }
    }

    fn pod_template() -> ExpansionTemplate {
        ExpansionTemplate {
            name: "deployment-to-pod".into(),
            apply_to: vec![ApplyToTuple { groups: vec!["apps".into()], versions: vec!["v1".into()], kinds: vec!["Deployment".into()] }],
            template_source: "spec.template".into(),
            generated_gvk: Gvk::new("", "v1", "Pod"),
            enforcement_action: None,
        }
    }

    #[test]
    fn expands_deployment_into_one_pod_with_owner_reference() {
        let system = ExpansionSystem::new(EngineConfig::default());
        system.upsert_template(pod_template()).unwrap();

        let mut gen = deployment();
        let results = system.expand(&mut gen, &CancellationToken::new()).unwrap();

        assert_eq!(results.len(), 1);
        let pod = &results[0].object;
        assert_eq!(pod["kind"], "Pod");
        assert_eq!(pod["metadata"]["ownerReferences"][0]["name"], "nginx-dep");
        assert_eq!(pod["spec"]["containers"][0]["name"], "nginx");
    }

    #[test]
    fn missing_template_source_is_an_error() {
        let system = ExpansionSystem::new(EngineConfig::default());
        let mut bad_template = pod_template();
        bad_template.template_source = "spec.missingField".into();
        system.upsert_template(bad_template).unwrap();

        let mut gen = deployment();
        let err = system.expand(&mut gen, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ExpansionError::MissingSource { .. }));
    }

    #[test]
    fn mutator_applies_to_resultant_before_recursion() {
        let system = ExpansionSystem::new(EngineConfig::default());
        system.upsert_template(pod_template()).unwrap();
        system
            .upsert_mutator(Mutator {
                id: MutatorId { kind: "AssignMetadata".into(), namespace: None, name: "owner-label".into() },
                apply_to: vec![ApplyToTuple { groups: vec!["".into()], versions: vec!["v1".into()], kinds: vec!["Pod".into()] }],
                operations: vec![],
                match_block: MatchBlock::default(),
                location: parse("metadata.labels.managed-by").unwrap(),
                kind: MutatorKind::AssignMetadata { value: json!("admission-expander") },
                tests: vec![],
            })
            .unwrap();

        let mut gen = deployment();
        let results = system.expand(&mut gen, &CancellationToken::new()).unwrap();
        assert_eq!(results[0].object["metadata"]["labels"]["managed-by"], "admission-expander");
    }

    #[test]
    fn cancellation_token_aborts_expansion() {
        let system = ExpansionSystem::new(EngineConfig::default());
        system.upsert_template(pod_template()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let mut gen = deployment();
        let err = system.expand(&mut gen, &token).unwrap_err();
        assert!(matches!(err, ExpansionError::Cancelled));
    }
}
