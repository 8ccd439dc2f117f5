//! The path AST (§3, §4.1): an ordered sequence of object and list nodes.

use serde::{Deserialize, Serialize};

/// How a list node selects the element(s) it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListSelector {
    /// `[key:value]` — find-or-append the element whose `key_field` equals
    /// `value`. Permits append when this is the terminal node.
    Key(String),
    /// `[key:*]` — broadcast the sub-mutation to every element.
    Glob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathNode {
    /// A plain field name, descending into a map.
    Object { field: String },
    /// `field[key_field:selector]`, descending into a list.
    List {
        field: String,
        key_field: String,
        selector: ListSelector,
    },
}

impl PathNode {
    pub fn field(&self) -> &str {
        match self {
            PathNode::Object { field } => field,
            PathNode::List { field, .. } => field,
        }
    }
}

/// A parsed path expression: `a.b[key:val].c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<PathNode>,
}

impl Path {
    /// The last node, which governs write semantics at the assignment site.
    pub fn terminal(&self) -> &PathNode {
        self.nodes.last().expect("Path must have at least one node")
    }

    pub fn as_str_repr(&self) -> String {
        self.nodes
            .iter()
            .map(|n| match n {
                PathNode::Object { field } => field.clone(),
                PathNode::List { field, key_field, selector } => {
                    let sel = match selector {
                        ListSelector::Key(v) => v.clone(),
                        ListSelector::Glob => "*".to_string(),
                    };
                    format!("{field}[{key_field}:{sel}]")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}
