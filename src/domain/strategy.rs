//! Dependency update strategies
//!
//! Decides whether a declared dependency version follows a changed
//! workspace module to its new version.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::module::Module;
use super::version;

/// Policy for rewriting dependency versions of dirty modules
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// Always follow the dirty module
    #[default]
    Always,
    /// Follow only if the major version is unchanged
    SameMajor,
    /// Follow only if major and minor versions are unchanged
    SameMajorMinor,
    /// Follow only if the base version is unchanged
    SameBaseVersion,
}

impl UpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategy::Always => "always",
            UpdateStrategy::SameMajor => "same_major",
            UpdateStrategy::SameMajorMinor => "same_major_minor",
            UpdateStrategy::SameBaseVersion => "same_base_version",
        }
    }

    /// Returns true if a reference declared as `declared` should move to `new_base`
    pub fn accepts(&self, declared: &str, new_base: &str) -> bool {
        match self {
            UpdateStrategy::Always => true,
            UpdateStrategy::SameMajor => version::same_major(declared, new_base),
            UpdateStrategy::SameMajorMinor => version::same_major_minor(declared, new_base),
            UpdateStrategy::SameBaseVersion => version::same_base(declared, new_base),
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides the new version for a dependency declared as `declared` on `target`
///
/// Returns `None` when the target is not dirty, has no version assignment,
/// or the strategy rejects the move.
pub fn decide_dependency_version(
    declared: &str,
    target: &Module,
    strategy: UpdateStrategy,
) -> Option<String> {
    if !target.dirty {
        return None;
    }
    let base = target.base_version.as_deref()?;
    let revision = target.next_revision_id.as_deref()?;

    if strategy.accepts(declared, base) {
        Some(version::compose(base, revision))
    } else {
        None
    }
}

/// Decides the new version for a parent reference
///
/// Parent references ignore the strategy and always follow a dirty parent.
pub fn decide_parent_version(declared: &str, parent: &Module) -> Option<String> {
    decide_dependency_version(declared, parent, UpdateStrategy::Always)
}
