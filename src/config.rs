//! Per-instance configuration options (§6.1).

use serde::{Deserialize, Serialize};

/// Controls how a single leading/trailing `*` in a namespace or name glob is
/// honored (§4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobStyle {
    /// Only a trailing `*` acts as a wildcard (`prod-*`); a leading `*` is
    /// matched literally.
    PrefixOnly,
    /// Both a leading and a trailing `*` act as wildcards (`*-prod-*`).
    PrefixAndSuffix,
}

impl Default for GlobStyle {
    fn default() -> Self {
        GlobStyle::PrefixOnly
    }
}

/// Engine-wide configuration, constructed once by the caller and threaded
/// into the registry/DB at construction time. Immutable for the life of the
/// instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// When true, template upsert/remove emits a scope-sync marker event so
    /// downstream validating-admission-policy objects know to re-bind. The
    /// actual sync transport is the out-of-scope reconciler's job.
    #[serde(default)]
    pub enforce_scope_sync: bool,

    #[serde(default)]
    pub wildcard_glob_style: GlobStyle,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
