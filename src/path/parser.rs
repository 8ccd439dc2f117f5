//! Grammar (§4.1):
//!
//! ```text
//! object := IDENT
//! list   := IDENT '[' IDENT ':' ( value | '*' ) ']'
//! path   := node ( '.' node )*
//! ```
//!
//! Fails on empty input, empty segments (`a..b`), and malformed list syntax.

use super::ast::{ListSelector, Path, PathNode};
use crate::error::{ExpansionError, Result};

pub fn parse(expr: &str) -> Result<Path> {
    if expr.is_empty() {
        return Err(invalid(expr, "path expression must not be empty"));
    }

    let segments = split_top_level(expr)?;
    let mut nodes = Vec::with_capacity(segments.len());
    for segment in &segments {
        if segment.is_empty() {
            return Err(invalid(expr, "path contains an empty segment"));
        }
        nodes.push(parse_segment(expr, segment)?);
    }

    reject_key_field_mutation(expr, &nodes)?;

    Ok(Path { nodes })
}

/// Split on `.` but not inside `[...]`.
fn split_top_level(expr: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid(expr, "unbalanced ']'"));
                }
                current.push(c);
            }
            '.' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err(invalid(expr, "unbalanced '['"));
    }
    segments.push(current);
    Ok(segments)
}

fn parse_segment(expr: &str, segment: &str) -> Result<PathNode> {
    match segment.find('[') {
        None => Ok(PathNode::Object { field: segment.to_string() }),
        Some(bracket_start) => {
            if !segment.ends_with(']') {
                return Err(invalid(expr, &format!("malformed list segment '{segment}'")));
            }
            let field = &segment[..bracket_start];
            if field.is_empty() {
                return Err(invalid(expr, &format!("list segment '{segment}' missing field name")));
            }
            let inner = &segment[bracket_start + 1..segment.len() - 1];
            let (key_field, selector_str) = inner.split_once(':').ok_or_else(|| {
                invalid(expr, &format!("list segment '{segment}' missing ':' in key spec"))
            })?;
            if key_field.is_empty() || selector_str.is_empty() {
                return Err(invalid(expr, &format!("list segment '{segment}' has an empty key or value")));
            }
            let selector = if selector_str == "*" {
                ListSelector::Glob
            } else {
                ListSelector::Key(selector_str.to_string())
            };
            Ok(PathNode::List {
                field: field.to_string(),
                key_field: key_field.to_string(),
                selector,
            })
        }
    }
}

/// §3 invariant: a list node must not be immediately followed by an object
/// node naming that list's own key field — such a path would mutate the
/// element's identity.
fn reject_key_field_mutation(expr: &str, nodes: &[PathNode]) -> Result<()> {
    for window in nodes.windows(2) {
        if let PathNode::List { key_field, .. } = &window[0] {
            if let PathNode::Object { field } = &window[1] {
                if field == key_field {
                    return Err(invalid(
                        expr,
                        &format!("path would mutate list key field '{key_field}'"),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn invalid(expr: &str, reason: &str) -> ExpansionError {
    ExpansionError::InvalidPath {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}
