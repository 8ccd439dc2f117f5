//! Template data model (§3, §4.3): a generator GVK, the path into it that
//! supplies the resultant's body, and the GVK the resultant is re-typed to.

use crate::error::{ExpansionError, Result};
use crate::gvk::{ApplyToTuple, Gvk};

#[derive(Debug, Clone)]
pub struct ExpansionTemplate {
    pub name: String,
    /// GVKs of the generator objects this template fires against.
    pub apply_to: Vec<ApplyToTuple>,
    /// Dotted field path into the generator supplying the resultant body
    /// (e.g. `spec.template` on a Deployment).
    pub template_source: String,
    /// GVK the resultant is re-typed to after extraction.
    pub generated_gvk: Gvk,
    pub enforcement_action: Option<String>,
}

impl ExpansionTemplate {
    /// §4.3 shape invariants, checked at upsert time.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(shape("template name must not be empty"));
        }
        if self.apply_to.is_empty() {
            return Err(shape("template must have at least one applyTo tuple"));
        }
        if self.template_source.is_empty() {
            return Err(shape("template must declare a non-empty templateSource path"));
        }
        if self.generated_gvk.is_empty() {
            return Err(shape("template must declare a non-empty generatedGVK"));
        }
        if crate::gvk::apply_to_matches(&self.apply_to, &self.generated_gvk) {
            return Err(ExpansionError::SelfReferentialTemplate { gvk: self.generated_gvk.clone() });
        }
        Ok(())
    }
}

fn shape(message: &str) -> ExpansionError {
    ExpansionError::Shape { message: message.to_string() }
}
