//! Domain models for nonsnapshot
//!
//! Contains the version rules and the workspace graph without any I/O concerns.

pub mod version;
mod module;
mod strategy;
mod workspace;
mod plan;

pub use module::{
    Coordinates, CoordinatesError, Dependency, Module, ModuleIndex, ParentRef, TextPosition, VersionSite,
    PLACEHOLDER_VERSION,
};
pub use strategy::{decide_dependency_version, decide_parent_version, UpdateStrategy};
pub use workspace::{EdgeKind, VersionAssignment, Workspace, WorkspaceError};
pub use plan::{plan_all, plan_updates, EditKind, EditTarget, UpdatePlan, VersionEdit};
