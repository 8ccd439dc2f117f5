//! The mutator match predicate (§4.2): all of (a)-(h) must hold.

use super::model::{Mutator, OperationToken, Scope};
use crate::config::EngineConfig;
use crate::glob::{glob_match, matches_any_or_unconstrained, matches_none};
use crate::gvk::apply_to_matches;
use crate::object::{object_gvk, object_labels, object_name, Mutable};

pub fn matches(mutator: &Mutator, mutable: &Mutable, config: &EngineConfig) -> bool {
    // A mutator with a malformed selector is created but counts as "does
    // not match" for every future call (§7 Match errors).
    if mutator.invalid_selector_key().is_some() {
        return false;
    }

    let gvk = object_gvk(&mutable.object);

    // (a) GVK
    if !apply_to_matches(&mutator.apply_to, &gvk) {
        return false;
    }

    // (b) operation
    if !operation_matches(&mutator.operations, mutable.operation) {
        return false;
    }

    // (c) source
    if !mutator.match_block.source.matches(mutable.source) {
        return false;
    }

    let is_namespace_kind = gvk.kind == "Namespace";

    // (d) scope — Namespace objects are cluster-scoped regardless of their
    // own `metadata.namespace` field.
    let object_is_cluster_scoped = is_namespace_kind || mutable.namespace.is_none();
    let scope_ok = match mutator.match_block.scope {
        Scope::Cluster => object_is_cluster_scoped,
        Scope::Namespaced => !object_is_cluster_scoped,
    };
    if !scope_ok {
        return false;
    }

    // (e) namespace allow/deny globs — skipped entirely for cluster-scoped
    // objects (including Namespace objects), matching "unknown namespace
    // means no constraint" style recovery.
    if !object_is_cluster_scoped {
        let ns_name = mutable.namespace.as_ref().map(|n| n.name.as_str()).unwrap_or("");
        if !matches_any_or_unconstrained(&mutator.match_block.namespaces, ns_name, config.wildcard_glob_style) {
            return false;
        }
        if !matches_none(&mutator.match_block.excluded_namespaces, ns_name, config.wildcard_glob_style) {
            return false;
        }
    }

    // (f) object labels
    let object_labels = object_labels(&mutable.object);
    if !mutator.match_block.label_selector.matches(&object_labels) {
        return false;
    }

    // (g) namespace labels (or, for Namespace objects, the object's own
    // labels)
    let namespace_labels = if is_namespace_kind {
        object_labels.clone()
    } else {
        mutable.namespace.as_ref().map(|n| n.labels.clone()).unwrap_or_default()
    };
    if !mutator.match_block.namespace_selector.matches(&namespace_labels) {
        return false;
    }

    // (h) name glob
    if let Some(glob) = &mutator.match_block.name_glob {
        let name = object_name(&mutable.object);
        if !glob_match(glob, name, config.wildcard_glob_style) {
            return false;
        }
    }

    true
}

fn operation_matches(filter: &[OperationToken], operation: Option<crate::object::Operation>) -> bool {
    use crate::object::Operation as Op;
    let Some(op) = operation else {
        // Empty admission context bypasses operation-filtering entirely (§6).
        return true;
    };
    if filter.is_empty() || filter.contains(&OperationToken::Any) {
        return true;
    }
    let token = match op {
        Op::Create => OperationToken::Create,
        Op::Update => OperationToken::Update,
        Op::Delete => OperationToken::Delete,
        Op::Connect => OperationToken::Connect,
    };
    filter.contains(&token)
}
