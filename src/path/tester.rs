//! Existence preconditions on live objects (§4.1). A failed condition aborts
//! the mutation it guards silently — no error — so a mutator can declare
//! "only create this field if absent" without the caller having to special
//! case it.

use super::ast::{ListSelector, Path, PathNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    MustExist,
    MustNotExist,
}

#[derive(Debug, Clone)]
pub struct PathTest {
    pub subpath: Path,
    pub condition: Condition,
}

impl PathTest {
    pub fn evaluate(&self, object: &Value) -> bool {
        let exists = !resolve(object, &self.subpath.nodes).is_empty();
        match self.condition {
            Condition::MustExist => exists,
            Condition::MustNotExist => !exists,
        }
    }
}

/// A mutator's full set of preconditions; all must pass for the mutation to
/// fire.
#[derive(Debug, Clone, Default)]
pub struct Tester {
    pub tests: Vec<PathTest>,
}

impl Tester {
    pub fn all_pass(&self, object: &Value) -> bool {
        self.tests.iter().all(|t| t.evaluate(object))
    }
}

/// Read-only path resolution: returns every live node reached by walking
/// `nodes` from `value`. A glob list node broadcasts into every element; a
/// missing segment or a scalar where a map/list was expected yields no
/// matches rather than erroring (fail-soft, matching the write-side
/// semantics of §4.2).
pub fn resolve<'a>(value: &'a Value, nodes: &[PathNode]) -> Vec<&'a Value> {
    let Some((head, rest)) = nodes.split_first() else {
        return vec![value];
    };
    match head {
        PathNode::Object { field } => match value.as_object().and_then(|m| m.get(field)) {
            Some(next) => resolve(next, rest),
            None => vec![],
        },
        PathNode::List { field, key_field, selector } => {
            let Some(list) = value.as_object().and_then(|m| m.get(field)).and_then(Value::as_array) else {
                return vec![];
            };
            match selector {
                ListSelector::Glob => list.iter().flat_map(|elem| resolve(elem, rest)).collect(),
                ListSelector::Key(key_value) => {
                    let found = list
                        .iter()
                        .find(|elem| elem.get(key_field).and_then(Value::as_str) == Some(key_value.as_str()));
                    match found {
                        Some(elem) => resolve(elem, rest),
                        None => vec![],
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parser::parse;
    use serde_json::json;

    #[test]
    fn must_exist_passes_when_present() {
        let obj = json!({"metadata": {"labels": {"app": "nginx"}}});
        let test = PathTest {
            subpath: parse("metadata.labels.app").unwrap(),
            condition: Condition::MustExist,
        };
        assert!(test.evaluate(&obj));
    }

    #[test]
    fn must_not_exist_passes_when_absent() {
        let obj = json!({"metadata": {}});
        let test = PathTest {
            subpath: parse("metadata.labels.app").unwrap(),
            condition: Condition::MustNotExist,
        };
        assert!(test.evaluate(&obj));
    }

    #[test]
    fn scalar_where_map_expected_is_fail_soft() {
        let obj = json!({"metadata": "not-a-map"});
        let test = PathTest {
            subpath: parse("metadata.labels.app").unwrap(),
            condition: Condition::MustNotExist,
        };
        assert!(test.evaluate(&obj));
    }

    #[test]
    fn glob_resolves_into_every_element() {
        let obj = json!({"spec": {"containers": [{"name": "a", "image": "x"}, {"name": "b", "image": "y"}]}});
        let path = parse("spec.containers[name:*].image").unwrap();
        let resolved = resolve(&obj, &path.nodes);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn tester_all_pass_is_conjunction() {
        let obj = json!({"metadata": {"labels": {"app": "nginx"}}});
        let tester = Tester {
            tests: vec![
                PathTest { subpath: parse("metadata.labels.app").unwrap(), condition: Condition::MustExist },
                PathTest { subpath: parse("metadata.labels.missing").unwrap(), condition: Condition::MustNotExist },
            ],
        };
        assert!(tester.all_pass(&obj));
    }
}
