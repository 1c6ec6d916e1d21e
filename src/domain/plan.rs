//! Update planning
//!
//! Turns the dirty state of a workspace into the exact edits each
//! descriptor needs, each pinned to the line and byte column of its token.
//! Planning is pure: nothing here touches the disk, so every module can be
//! planned before the first file is written.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::module::{Coordinates, ModuleIndex, TextPosition, VersionSite};
use super::strategy::{decide_dependency_version, decide_parent_version, UpdateStrategy};
use super::version;
use super::workspace::Workspace;

/// What a version edit changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum EditTarget {
    /// The module's own version
    Module,
    /// The version in the parent block
    Parent,
    /// The version of a dependency block
    Dependency(Coordinates),
}

/// How the edit is applied to its line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EditKind {
    /// Replace `current` with the new version on the line
    Replace { current: String },
    /// Insert a new version element after the line
    InsertAfter,
}

/// One version edit at a 1-based line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEdit {
    pub line: usize,
    /// Byte offset of the replaced token within the line (0 for insertions)
    pub column: usize,
    pub kind: EditKind,
    pub new_version: String,
    pub target: EditTarget,
}

impl VersionEdit {
    pub fn replace(
        position: TextPosition,
        current: &str,
        new_version: String,
        target: EditTarget,
    ) -> Self {
        Self {
            line: position.line,
            column: position.column,
            kind: EditKind::Replace {
                current: current.to_string(),
            },
            new_version,
            target,
        }
    }

    pub fn insert_after(line: usize, new_version: String) -> Self {
        Self {
            line,
            column: 0,
            kind: EditKind::InsertAfter,
            new_version,
            target: EditTarget::Module,
        }
    }
}

/// All edits for one descriptor file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    pub path: PathBuf,
    pub module: Coordinates,
    /// Version after the update (unchanged if the module is clean)
    pub final_version: String,
    pub edits: Vec<VersionEdit>,
}

impl UpdatePlan {
    /// Returns true if the plan changes nothing
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Plans the edits for one module
///
/// Returns `None` if `idx` does not belong to the workspace.
pub fn plan_updates(
    workspace: &Workspace,
    idx: ModuleIndex,
    strategy: UpdateStrategy,
) -> Option<UpdatePlan> {
    let module = workspace.get(idx)?;
    let mut edits = Vec::new();

    // Own version
    if let Some(next) = module.next_version() {
        match module.version_site {
            Some(VersionSite::InsertAfter(line)) => {
                edits.push(VersionEdit::insert_after(line, next));
            }
            Some(VersionSite::Token(_)) if version::is_property_reference(&module.version) => {
                warn!(
                    module = %module.coordinates,
                    declared = %module.version,
                    "Module version is a property reference, leaving it unchanged"
                );
            }
            Some(VersionSite::Token(position)) if next != module.version => {
                edits.push(VersionEdit::replace(
                    position,
                    &module.version,
                    next,
                    EditTarget::Module,
                ));
            }
            Some(VersionSite::Token(_)) => {}
            None => warn!(module = %module.coordinates, "Dirty module has no version location"),
        }
    }

    // Parent reference
    if let Some(parent) = &module.parent {
        let decision = parent
            .resolved
            .and_then(|p| workspace.get(p))
            .and_then(|target| decide_parent_version(&parent.version, target));

        match (decision, parent.version_position) {
            (Some(_), _) if version::is_property_reference(&parent.version) => {
                warn!(
                    module = %module.coordinates,
                    declared = %parent.version,
                    "Parent version is a property reference, leaving it unchanged"
                );
            }
            (Some(next), Some(position)) if next != parent.version => {
                edits.push(VersionEdit::replace(
                    position,
                    &parent.version,
                    next,
                    EditTarget::Parent,
                ));
            }
            (Some(_), None) => {
                warn!(module = %module.coordinates, "Parent block has no version location")
            }
            _ => {}
        }
    }

    // Dependencies
    for dependency in &module.dependencies {
        let Some(target) = dependency.resolved.and_then(|d| workspace.get(d)) else {
            continue;
        };
        let (Some(declared), Some(position)) =
            (dependency.version.as_deref(), dependency.version_position)
        else {
            debug!(
                module = %module.coordinates,
                dependency = %dependency.coordinates,
                "Dependency declares no version, skipping"
            );
            continue;
        };
        if version::is_property_reference(declared) {
            debug!(
                module = %module.coordinates,
                dependency = %dependency.coordinates,
                declared,
                "Dependency version is a property reference, skipping"
            );
            continue;
        }

        match decide_dependency_version(declared, target, strategy) {
            Some(next) if next != declared => {
                debug!(
                    module = %module.coordinates,
                    dependency = %dependency.coordinates,
                    from = declared,
                    to = %next,
                    "Dependency version follows"
                );
                edits.push(VersionEdit::replace(
                    position,
                    declared,
                    next,
                    EditTarget::Dependency(dependency.coordinates.clone()),
                ));
            }
            Some(_) => {}
            None if target.dirty => debug!(
                module = %module.coordinates,
                dependency = %dependency.coordinates,
                %strategy,
                "Strategy keeps dependency version"
            ),
            None => {}
        }
    }

    Some(UpdatePlan {
        path: module.path.clone(),
        module: module.coordinates.clone(),
        final_version: module.final_version(),
        edits,
    })
}

/// Plans the edits for every module in the workspace
pub fn plan_all(workspace: &Workspace, strategy: UpdateStrategy) -> Vec<UpdatePlan> {
    workspace
        .indices()
        .filter_map(|idx| plan_updates(workspace, idx, strategy))
        .collect()
}
