//! The schemaless object tree and the per-request records that flow through
//! the engine (§3, §6). `serde_json::Value` is used directly as the
//! `{scalar, sequence<node>, mapping<string,node>}` sum type §9 calls for —
//! it already has exactly that shape, and every resource in this ecosystem
//! is navigated unstructured because CRD schemas aren't known at compile
//! time.

use crate::gvk::Gvk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provenance tag on a resource: whether it arrived as the original
/// admission request or was synthesized by this engine's own expansion.
/// Used to keep mutators from re-firing on their own output (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Original,
    Generated,
}

/// The admission operation under which a Mutable is being evaluated.
/// `None` means "no admission context" (audit, testing) and bypasses
/// operation filtering entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

/// The record handed to the engine on admission: {object, namespace,
/// username, source} plus the admission operation under evaluation (§6).
#[derive(Debug, Clone)]
pub struct Mutable {
    pub object: Value,
    pub namespace: Option<NamespaceInfo>,
    pub username: String,
    pub source: Source,
    pub operation: Option<Operation>,
}

/// The subset of a Namespace object the matcher needs: its own labels, used
/// both as `namespaceSelector` input for objects inside it and, for
/// Namespace objects themselves, as the object's own labels (§4.2g).
#[derive(Debug, Clone, Default)]
pub struct NamespaceInfo {
    pub name: String,
    pub labels: std::collections::BTreeMap<String, String>,
}

/// A resultant produced by expanding one template against a generator
/// (§3). Owned exclusively by the `expand` call that produced it.
#[derive(Debug, Clone)]
pub struct Resultant {
    pub object: Value,
    pub old_object: Option<Value>,
    pub template_name: String,
    pub enforcement_action: Option<String>,
}

/// Read the object's GVK from `apiVersion`/`kind`. Returns the empty `Gvk`
/// if either field is absent or not a string.
pub fn object_gvk(object: &Value) -> Gvk {
    let api_version = object.get("apiVersion").and_then(Value::as_str).unwrap_or("");
    let kind = object.get("kind").and_then(Value::as_str).unwrap_or("").to_string();
    let (group, version) = split_api_version(api_version);
    Gvk { group, version, kind }
}

fn split_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

pub fn object_name(object: &Value) -> &str {
    object
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("")
}

pub fn object_namespace(object: &Value) -> Option<&str> {
    object.pointer("/metadata/namespace").and_then(Value::as_str)
}

pub fn object_labels(object: &Value) -> std::collections::BTreeMap<String, String> {
    object
        .pointer("/metadata/labels")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the nested map at a dotted field path (object segments only —
/// used for `templateSource`, which is always a plain field path into the
/// generator, never a keyed-list path). Returns `None` if any segment is
/// absent or the path walks into a non-object.
pub fn nested_map<'a>(object: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    let mut cursor = object;
    for segment in dotted_path.split('.') {
        if segment.is_empty() {
            return None;
        }
        cursor = cursor.get(segment)?;
    }
    Some(cursor)
}

/// Stamp `apiVersion`/`kind` onto an object, overwriting any existing
/// values — used when a resultant is re-typed to its `generatedGVK`.
pub fn set_gvk(object: &mut Value, gvk: &Gvk) {
    let map = object
        .as_object_mut()
        .expect("resultant object must be a JSON object");
    let api_version = if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    };
    map.insert("apiVersion".to_string(), Value::String(api_version));
    map.insert("kind".to_string(), Value::String(gvk.kind.clone()));
}

/// Attach an owner reference pointing at the generator, unless an entry with
/// the same (apiVersion, kind, name) already exists (§4.4.1: checked by
/// value, not by `uid`).
pub fn ensure_owner_reference(object: &mut Value, generator: &Value) {
    let gen_api_version = generator.get("apiVersion").and_then(Value::as_str).unwrap_or("");
    let gen_kind = generator.get("kind").and_then(Value::as_str).unwrap_or("");
    let gen_name = object_name(generator);
    let gen_uid = generator.pointer("/metadata/uid").and_then(Value::as_str);

    let mut owner_ref = serde_json::Map::new();
    owner_ref.insert("apiVersion".to_string(), Value::String(gen_api_version.to_string()));
    owner_ref.insert("kind".to_string(), Value::String(gen_kind.to_string()));
    owner_ref.insert("name".to_string(), Value::String(gen_name.to_string()));
    if let Some(uid) = gen_uid {
        owner_ref.insert("uid".to_string(), Value::String(uid.to_string()));
    }

    let metadata = object
        .as_object_mut()
        .expect("resultant object must be a JSON object")
        .entry("metadata")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    let metadata = metadata.as_object_mut().expect("metadata must be an object");
    let refs = metadata
        .entry("ownerReferences")
        .or_insert_with(|| Value::Array(Vec::new()));
    let refs = refs.as_array_mut().expect("ownerReferences must be an array");

    let already_present = refs.iter().any(|r| {
        r.get("apiVersion").and_then(Value::as_str) == Some(gen_api_version)
            && r.get("kind").and_then(Value::as_str) == Some(gen_kind)
            && r.get("name").and_then(Value::as_str) == Some(gen_name)
    });
    if !already_present {
        refs.push(Value::Object(owner_ref));
    }
}
