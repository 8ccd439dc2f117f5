//! Policy expansion engine for a Kubernetes admission-policy controller.
//!
//! Five components, leaves-first: the path parser & tester (`path`), the
//! mutator registry (`mutator`), the template database (`template`), the
//! expansion system (`expand`) that ties the two together, and the
//! aggregation helpers (`aggregate`) used by the caller's validator.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod expand;
pub mod glob;
pub mod gvk;
pub mod mutator;
pub mod object;
pub mod path;
pub mod selector;
pub mod template;

pub use config::{EngineConfig, GlobStyle};
pub use error::{ExpansionError, Result};
pub use expand::ExpansionSystem;
pub use gvk::Gvk;
pub use object::{Mutable, NamespaceInfo, Operation, Resultant, Source};
