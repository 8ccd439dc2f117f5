//! Template database (C3, §4.3): the GVK-indexed template store plus the
//! expansion-chain graph used for cycle detection. One template is a node;
//! an edge `A -> B` means template `B` could consume `A`'s resultant as its
//! own generator. A conflict-adjacent mutation re-runs Tarjan's
//! strongly-connected-components algorithm over the whole graph rather than
//! updating incrementally — the graph is bounded at a few thousand nodes, so
//! the full re-run is cheap and avoids an entire class of incremental-update
//! bugs (§4.3.1).

use super::model::ExpansionTemplate;
use crate::config::EngineConfig;
use crate::error::{ExpansionError, Result};
use crate::gvk::{apply_to_matches, Gvk};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::{debug, info};

struct Inner {
    templates: BTreeMap<String, ExpansionTemplate>,
    graph: DiGraph<String, ()>,
    node_index: HashMap<String, NodeIndex>,
}

impl Inner {
    fn rebuild_edges(&mut self) {
        self.graph.clear_edges();
        let names: Vec<String> = self.templates.keys().cloned().collect();
        for producer in &names {
            let produced_gvk = &self.templates[producer].generated_gvk;
            for consumer in &names {
                if apply_to_matches(&self.templates[consumer].apply_to, produced_gvk) {
                    let from = self.node_index[producer];
                    let to = self.node_index[consumer];
                    self.graph.add_edge(from, to, ());
                }
            }
        }
    }

    /// Every strongly-connected component of size > 1, plus every
    /// self-looping singleton component (§4.3.1).
    fn find_cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter_map(|component| {
                let is_cycle = component.len() > 1
                    || component.first().is_some_and(|&n| self.graph.contains_edge(n, n));
                is_cycle.then(|| component.iter().map(|&idx| self.graph[idx].clone()).collect())
            })
            .collect()
    }

    /// The `hasConflicts` set: every template id that belongs to a cycle in
    /// the expansion-chain graph, derived fresh from `find_cycles` rather
    /// than tracked as a separate mutable flag.
    fn conflicted_names(&self) -> std::collections::HashSet<String> {
        self.find_cycles().into_iter().flatten().collect()
    }
}

/// Guards the template store and its graph behind one `RwLock`, mirroring
/// the registry's synchronous-lock choice (§5.1).
pub struct TemplateDb {
    config: EngineConfig,
    inner: RwLock<Inner>,
}

impl TemplateDb {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                templates: BTreeMap::new(),
                graph: DiGraph::new(),
                node_index: HashMap::new(),
            }),
        }
    }

    fn maybe_emit_scope_sync(&self, name: &str) {
        if self.config.enforce_scope_sync {
            info!(template = %name, "scope sync warranted after template mutation");
        }
    }

    /// Insert or replace a template, then re-run SCC classification over the
    /// whole graph. The edges that close a cycle are kept (so the cyclic set
    /// stays visible through `conflicts()`/`get()`), but every id in the
    /// closing strongly-connected component is excluded from `templates_for`
    /// until the cycle is broken, and this call returns `Cycle` for the
    /// upserted template itself.
    pub fn upsert(&self, template: ExpansionTemplate) -> Result<()> {
        template.validate()?;
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        inner.templates.insert(template.name.clone(), template.clone());
        if !inner.node_index.contains_key(&template.name) {
            let idx = inner.graph.add_node(template.name.clone());
            inner.node_index.insert(template.name.clone(), idx);
        }
        inner.rebuild_edges();

        let cycles = inner.find_cycles();
        if let Some(cycle) = cycles.into_iter().find(|c| c.contains(&template.name)) {
            debug!(template = %template.name, cycle = %cycle.join(", "), "template forms cycle, marked conflicted");
            self.maybe_emit_scope_sync(&template.name);
            return Err(ExpansionError::Cycle { id: cycle.join(", ") });
        }

        debug!(template = %template.name, "template upserted");
        self.maybe_emit_scope_sync(&template.name);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.templates.remove(name);
        if let Some(idx) = inner.node_index.remove(name) {
            inner.graph.remove_node(idx);
            // `remove_node` swaps the last node into the freed slot; patch
            // the displaced entry's index rather than rebuilding the map.
            if let Some(displaced) = inner.graph.node_weight(idx).cloned() {
                inner.node_index.insert(displaced, idx);
            }
        }
        inner.rebuild_edges();
        drop(inner);
        self.maybe_emit_scope_sync(name);
        Ok(())
    }

    /// Every template whose `applyTo` matches `generator_gvk`, in name
    /// order, excluding any template currently flagged `hasConflicts` by a
    /// cycle in the expansion-chain graph.
    pub fn templates_for(&self, generator_gvk: &Gvk) -> Result<Vec<ExpansionTemplate>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let conflicted = inner.conflicted_names();
        Ok(inner
            .templates
            .values()
            .filter(|t| apply_to_matches(&t.apply_to, generator_gvk))
            .filter(|t| !conflicted.contains(&t.name))
            .cloned()
            .collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<ExpansionTemplate>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.templates.get(name).cloned())
    }

    /// Diagnostic: every cycle currently present in the expansion-chain
    /// graph. Expected to be empty in steady state since `upsert` rejects
    /// cycle-introducing mutations; exposed for inspection/debugging.
    pub fn conflicts(&self) -> Result<Vec<Vec<String>>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.find_cycles())
    }
}

impl Default for TemplateDb {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn poisoned() -> ExpansionError {
    ExpansionError::Shape { message: "template database lock poisoned".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvk::ApplyToTuple;

    fn template(name: &str, from_kind: &str, to_kind: &str) -> ExpansionTemplate {
        ExpansionTemplate {
            name: name.into(),
            apply_to: vec![ApplyToTuple { groups: vec!["".into()], versions: vec!["v1".into()], kinds: vec![from_kind.into()] }],
            template_source: "spec.template".into(),
            generated_gvk: Gvk::new("", "v1", to_kind),
            enforcement_action: None,
        }
    }

    #[test]
    fn upsert_and_lookup_by_generator_gvk() {
        let db = TemplateDb::new(EngineConfig::default());
        db.upsert(template("t1", "Deployment", "Pod")).unwrap();
        let found = db.templates_for(&Gvk::new("", "v1", "Deployment")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "t1");
    }

    #[test]
    fn remove_drops_from_lookup() {
        let db = TemplateDb::new(EngineConfig::default());
        db.upsert(template("t1", "Deployment", "Pod")).unwrap();
        db.remove("t1").unwrap();
        let found = db.templates_for(&Gvk::new("", "v1", "Deployment")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn direct_two_cycle_is_rejected() {
        let db = TemplateDb::new(EngineConfig::default());
        db.upsert(template("t1", "Deployment", "Pod")).unwrap();
        let err = db.upsert(template("t2", "Pod", "Deployment")).unwrap_err();
        assert!(matches!(err, ExpansionError::Cycle { .. }));
        // t2 is still stored (the cyclic set stays visible)...
        assert!(db.get("t2").unwrap().is_some());
        // ...but both sides of the cycle are excluded from lookup.
        assert!(db.templates_for(&Gvk::new("", "v1", "Deployment")).unwrap().is_empty());
        assert!(db.templates_for(&Gvk::new("", "v1", "Pod")).unwrap().is_empty());
    }

    #[test]
    fn self_referential_chain_via_three_templates_is_rejected() {
        let db = TemplateDb::new(EngineConfig::default());
        db.upsert(template("t1", "A", "B")).unwrap();
        db.upsert(template("t2", "B", "C")).unwrap();
        let err = db.upsert(template("t3", "C", "A")).unwrap_err();
        assert!(matches!(err, ExpansionError::Cycle { .. }));
    }

    #[test]
    fn acyclic_chain_is_accepted() {
        let db = TemplateDb::new(EngineConfig::default());
        db.upsert(template("t1", "Deployment", "Pod")).unwrap();
        db.upsert(template("t2", "StatefulSet", "Pod")).unwrap();
        assert!(db.conflicts().unwrap().is_empty());
    }
}
