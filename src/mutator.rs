//! Mutator registry (C2, §3-§4.2): the assign-field/assign-metadata/
//! assign-image/modify-set family, its match predicate, and the
//! write-side path application.

pub mod apply;
pub mod matching;
pub mod model;
pub mod registry;

pub use model::{MatchBlock, Mutator, MutatorId, MutatorKind, OperationToken, Scope, SourceFilter};
pub use registry::MutatorRegistry;
