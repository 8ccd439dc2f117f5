//! The write-side path walker (§4.2): applies a mutator's `kind` at its
//! `location`, auto-vivifying missing maps and arrays along the way and
//! failing soft wherever the live shape disagrees with the path (a scalar
//! where a map was expected, a missing list).

use super::model::{Mutator, MutatorKind};
use crate::error::{ExpansionError, Result};
use crate::path::ast::{ListSelector, PathNode};
use crate::path::tester::{Condition, PathTest};
use serde_json::{Map, Value};

/// Preconditions: the mutator's explicit `tests`, plus — for
/// `assign-metadata` — an implicit `MustNotExist` at `location` (§4.2: it
/// sets only if the key is absent).
pub fn should_apply(mutator: &Mutator, object: &Value) -> bool {
    if !mutator.tests.iter().all(|t| t.evaluate(object)) {
        return false;
    }
    if matches!(mutator.kind, MutatorKind::AssignMetadata { .. }) {
        let implicit = PathTest { subpath: mutator.location.clone(), condition: Condition::MustNotExist };
        if !implicit.evaluate(object) {
            return false;
        }
    }
    true
}

pub fn apply(mutator: &Mutator, object: &mut Value) -> Result<()> {
    walk_and_set(object, &mutator.location.nodes, &mutator.kind, &mutator.id)
}

fn walk_and_set(value: &mut Value, nodes: &[PathNode], kind: &MutatorKind, mutator_id: &super::model::MutatorId) -> Result<()> {
    let Some((head, rest)) = nodes.split_first() else {
        return Err(ExpansionError::Shape { message: "path must have at least one node".into() });
    };

    if rest.is_empty() {
        return apply_terminal(value, head, kind, mutator_id);
    }

    match head {
        PathNode::Object { field } => match vivify_map(value) {
            Some(map) => {
                let next = map.entry(field.clone()).or_insert(Value::Null);
                walk_and_set(next, rest, kind, mutator_id)
            }
            None => Ok(()), // fail-soft: scalar where a map was expected
        },
        PathNode::List { field, key_field, selector } => {
            let Some(map) = vivify_map(value) else { return Ok(()) };
            let entry = map.entry(field.clone()).or_insert_with(|| Value::Array(Vec::new()));
            let Some(array) = entry.as_array_mut() else { return Ok(()) };
            match selector {
                ListSelector::Glob => {
                    for elem in array.iter_mut() {
                        walk_and_set(elem, rest, kind, mutator_id)?;
                    }
                    Ok(())
                }
                ListSelector::Key(key_value) => {
                    let found = array
                        .iter_mut()
                        .find(|elem| elem.get(key_field.as_str()).and_then(Value::as_str) == Some(key_value.as_str()));
                    match found {
                        Some(elem) => walk_and_set(elem, rest, kind, mutator_id),
                        None => Ok(()), // non-terminal key miss: fail-soft, no source to descend into
                    }
                }
            }
        }
    }
}

fn apply_terminal(value: &mut Value, node: &PathNode, kind: &MutatorKind, mutator_id: &super::model::MutatorId) -> Result<()> {
    match node {
        PathNode::Object { field } => {
            let Some(map) = vivify_map(value) else { return Ok(()) };
            apply_terminal_field(map, field, kind, mutator_id)
        }
        PathNode::List { field, key_field, selector } => {
            let Some(map) = vivify_map(value) else { return Ok(()) };
            let entry = map.entry(field.clone()).or_insert_with(|| Value::Array(Vec::new()));
            let Some(array) = entry.as_array_mut() else { return Ok(()) };
            apply_terminal_list(array, key_field, selector, kind, mutator_id)
        }
    }
}

fn apply_terminal_field(map: &mut Map<String, Value>, field: &str, kind: &MutatorKind, mutator_id: &super::model::MutatorId) -> Result<()> {
    match kind {
        MutatorKind::AssignField { value } | MutatorKind::AssignMetadata { value } => {
            map.insert(field.to_string(), value.clone());
            Ok(())
        }
        MutatorKind::AssignImage { new_name, new_tag, new_digest } => {
            let current = map.get(field).and_then(Value::as_str).ok_or_else(|| ExpansionError::SetterRejected {
                mutator_id: mutator_id.as_str(),
                path: field.to_string(),
                reason: "assign-image location is not a string".into(),
            })?;
            let spliced = splice_image(current, new_name.as_deref(), new_tag.as_deref(), new_digest.as_deref());
            map.insert(field.to_string(), Value::String(spliced));
            Ok(())
        }
        MutatorKind::ModifySet { merge, prune } => {
            let entry = map.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
            let array = entry.as_array_mut().ok_or_else(|| ExpansionError::SetterRejected {
                mutator_id: mutator_id.as_str(),
                path: field.to_string(),
                reason: "modify-set location is not an array".into(),
            })?;
            modify_set(array, merge, prune);
            Ok(())
        }
    }
}

fn apply_terminal_list(
    array: &mut Vec<Value>,
    key_field: &str,
    selector: &ListSelector,
    kind: &MutatorKind,
    mutator_id: &super::model::MutatorId,
) -> Result<()> {
    let MutatorKind::AssignField { value } = kind else {
        return Err(ExpansionError::SetterRejected {
            mutator_id: mutator_id.as_str(),
            path: format!("{key_field}[..]"),
            reason: "only assign-field may terminate on a list node".into(),
        });
    };

    match selector {
        ListSelector::Glob => {
            for elem in array.iter_mut() {
                *elem = value.clone();
            }
            Ok(())
        }
        ListSelector::Key(key_value) => {
            let found = array
                .iter_mut()
                .find(|elem| elem.get(key_field).and_then(Value::as_str) == Some(key_value.as_str()));
            match found {
                Some(elem) => {
                    *elem = keyed_element(value, key_field, key_value);
                    Ok(())
                }
                None => {
                    array.push(keyed_element(value, key_field, key_value));
                    Ok(())
                }
            }
        }
    }
}

fn keyed_element(value: &Value, key_field: &str, key_value: &str) -> Value {
    let mut obj = value.as_object().cloned().unwrap_or_default();
    obj.insert(key_field.to_string(), Value::String(key_value.to_string()));
    Value::Object(obj)
}

fn vivify_map(value: &mut Value) -> Option<&mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut()
}

/// Add `merge` entries absent from the set, remove `prune` entries present
/// in it. Order of the untouched entries is preserved; merged entries are
/// appended in `merge` order. Idempotent: running twice yields the same set.
fn modify_set(array: &mut Vec<Value>, merge: &[String], prune: &[String]) {
    array.retain(|v| !v.as_str().is_some_and(|s| prune.iter().any(|p| p == s)));
    for value in merge {
        let already_present = array.iter().any(|v| v.as_str() == Some(value.as_str()));
        if !already_present {
            array.push(Value::String(value.clone()));
        }
    }
}

/// Splice a Docker-style image reference `[registry/]name[:tag][@digest]`.
/// Any of `new_name`/`new_tag`/`new_digest` left `None` preserves the
/// existing component.
fn splice_image(current: &str, new_name: Option<&str>, new_tag: Option<&str>, new_digest: Option<&str>) -> String {
    let (name_and_tag, digest) = match current.rsplit_once('@') {
        Some((a, b)) => (a, Some(b)),
        None => (current, None),
    };
    let slash_idx = name_and_tag.rfind('/');
    let colon_idx = name_and_tag.rfind(':');
    let (name, tag) = match colon_idx {
        Some(ci) if slash_idx.map_or(true, |si| ci > si) => (&name_and_tag[..ci], Some(&name_and_tag[ci + 1..])),
        _ => (name_and_tag, None),
    };

    // `new_name` replaces the domain+path prefix but keeps the original
    // image's base name (its final path segment) intact, e.g. `nginx` on
    // `nginx:1.14.2` spliced with `registry.internal/library` yields
    // `registry.internal/library/nginx:1.14.2`.
    let final_name = match new_name {
        Some(new_name) => {
            let basename = name.rsplit_once('/').map(|(_, last)| last).unwrap_or(name);
            format!("{new_name}/{basename}")
        }
        None => name.to_string(),
    };
    let final_tag = new_tag.or(tag);
    let final_digest = new_digest.or(digest);

    let mut out = final_name.to_string();
    if let Some(t) = final_tag {
        out.push(':');
        out.push_str(t);
    }
    if let Some(d) = final_digest {
        out.push('@');
        out.push_str(d);
    }
    out
}
