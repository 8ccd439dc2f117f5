//! Structured error taxonomy for the expansion engine (§7).
//!
//! Five kinds of failure are distinguished: shape errors at ingress, cycle
//! errors from the template graph, match errors from a bad selector, apply
//! errors from a runtime mutation, and missing-source errors from a template
//! whose source path doesn't fit a particular generator. `Cancelled` covers
//! cooperative cancellation (§5).

use crate::gvk::Gvk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error("shape error: {message}")]
    Shape { message: String },

    #[error("template '{id}' forms a cycle in the expansion graph")]
    Cycle { id: String },

    #[error("match error on '{id}': {message}")]
    Match { id: String, message: String },

    #[error("apply error: mutator '{mutator_id}' failed on generator '{generator_id}'")]
    Apply {
        mutator_id: String,
        generator_id: String,
        #[source]
        source: Box<ExpansionError>,
    },

    #[error("template '{template}' source path '{path}' not found on generator '{generator_id}'")]
    MissingSource {
        template: String,
        path: String,
        generator_id: String,
    },

    #[error("invalid path expression '{expr}': {reason}")]
    InvalidPath { expr: String, reason: String },

    #[error("setter rejected value at '{path}' for mutator '{mutator_id}': {reason}")]
    SetterRejected {
        mutator_id: String,
        path: String,
        reason: String,
    },

    #[error("generated GVK {gvk} also appears in template's own applyTo")]
    SelfReferentialTemplate { gvk: Gvk },

    #[error("expand call cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExpansionError>;
