//! Label selector matching (§4.2.1). `matchLabels` is an exact-match map;
//! `matchExpressions` is a list of `{key, operator, values[]}` terms. All
//! terms across both parts are ANDed. A selector with both parts empty
//! matches everything, which keeps an absent `labelSelector`/
//! `namespaceSelector` a no-op rather than requiring callers to special-case
//! it (mirrors the "unknown namespace means no constraint" recovery rule of
//! §7).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl SelectorRequirement {
    /// `In`/`NotIn` requirements are meaningless with no candidate values to
    /// compare against — the real Kubernetes API rejects such a
    /// `LabelSelectorRequirement` at validation time.
    fn is_invalid(&self) -> bool {
        matches!(self.operator, SelectorOperator::In | SelectorOperator::NotIn) && self.values.is_empty()
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self.operator {
            SelectorOperator::Exists => labels.contains_key(&self.key),
            SelectorOperator::DoesNotExist => !labels.contains_key(&self.key),
            SelectorOperator::In => labels
                .get(&self.key)
                .map(|v| self.values.iter().any(|candidate| candidate == v))
                .unwrap_or(false),
            SelectorOperator::NotIn => labels
                .get(&self.key)
                .map(|v| !self.values.iter().any(|candidate| candidate == v))
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub match_expressions: Vec<SelectorRequirement>,
}

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// The key of the first malformed `matchExpressions` entry, if any.
    pub fn invalid_requirement(&self) -> Option<&str> {
        self.match_expressions.iter().find(|req| req.is_invalid()).map(|req| req.key.as_str())
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let match_labels_ok = self
            .match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v));
        let expressions_ok = self.match_expressions.iter().all(|req| req.matches(labels));
        match_labels_ok && expressions_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let sel = LabelSelector::default();
        assert!(sel.matches(&labels(&[])));
        assert!(sel.matches(&labels(&[("tier", "frontend")])));
    }

    #[test]
    fn match_labels_is_exact() {
        let sel = LabelSelector {
            match_labels: [("tier".to_string(), "frontend".to_string())].into_iter().collect(),
            match_expressions: vec![],
        };
        assert!(sel.matches(&labels(&[("tier", "frontend")])));
        assert!(!sel.matches(&labels(&[("tier", "backend")])));
        assert!(!sel.matches(&labels(&[])));
    }

    #[test]
    fn exists_and_does_not_exist() {
        let exists = SelectorRequirement {
            key: "tier".into(),
            operator: SelectorOperator::Exists,
            values: vec![],
        };
        assert!(exists.matches(&labels(&[("tier", "frontend")])));
        assert!(!exists.matches(&labels(&[])));

        let absent = SelectorRequirement {
            key: "tier".into(),
            operator: SelectorOperator::DoesNotExist,
            values: vec![],
        };
        assert!(!absent.matches(&labels(&[("tier", "frontend")])));
        assert!(absent.matches(&labels(&[])));
    }

    #[test]
    fn in_and_not_in() {
        let sel_in = SelectorRequirement {
            key: "env".into(),
            operator: SelectorOperator::In,
            values: vec!["prod".into(), "staging".into()],
        };
        assert!(sel_in.matches(&labels(&[("env", "prod")])));
        assert!(!sel_in.matches(&labels(&[("env", "dev")])));
        assert!(!sel_in.matches(&labels(&[])));

        let sel_not_in = SelectorRequirement {
            key: "env".into(),
            operator: SelectorOperator::NotIn,
            values: vec!["prod".into()],
        };
        assert!(sel_not_in.matches(&labels(&[("env", "dev")])));
        assert!(!sel_not_in.matches(&labels(&[("env", "prod")])));
        assert!(sel_not_in.matches(&labels(&[])));
    }

    #[test]
    fn in_without_values_is_invalid() {
        let sel = LabelSelector {
            match_labels: BTreeMap::new(),
            match_expressions: vec![SelectorRequirement { key: "env".into(), operator: SelectorOperator::In, values: vec![] }],
        };
        assert_eq!(sel.invalid_requirement(), Some("env"));

        let exists_sel = LabelSelector {
            match_labels: BTreeMap::new(),
            match_expressions: vec![SelectorRequirement { key: "env".into(), operator: SelectorOperator::Exists, values: vec![] }],
        };
        assert_eq!(exists_sel.invalid_requirement(), None);
    }

    #[test]
    fn all_terms_are_anded() {
        let sel = LabelSelector {
            match_labels: [("tier".to_string(), "frontend".to_string())].into_iter().collect(),
            match_expressions: vec![SelectorRequirement {
                key: "env".into(),
                operator: SelectorOperator::In,
                values: vec!["prod".into()],
            }],
        };
        assert!(sel.matches(&labels(&[("tier", "frontend"), ("env", "prod")])));
        assert!(!sel.matches(&labels(&[("tier", "frontend"), ("env", "dev")])));
    }
}
