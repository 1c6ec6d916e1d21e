//! Module domain model
//!
//! A module is the in-memory record of one descriptor file: its identity,
//! current version, where that version lives in the file, and the parent
//! and dependency references it declares.
//!
//! References to other modules are stored as [`ModuleIndex`] values into
//! the owning [`Workspace`](super::Workspace), never as owned links.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use super::version;

/// Version assumed for modules that neither declare nor inherit a version
pub const PLACEHOLDER_VERSION: &str = "0.0.0";

#[derive(Debug, Error, PartialEq)]
pub enum CoordinatesError {
    #[error("Invalid coordinates: expected 'groupId:artifactId', got '{0}'")]
    Invalid(String),
}

/// Module identity: `groupId:artifactId`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinates {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for Coordinates {
    type Err = CoordinatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            Some((group, artifact))
                if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') =>
            {
                Ok(Self::new(group, artifact))
            }
            _ => Err(CoordinatesError::Invalid(s.to_string())),
        }
    }
}

impl TryFrom<String> for Coordinates {
    type Error = CoordinatesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coordinates> for String {
    fn from(coordinates: Coordinates) -> Self {
        coordinates.to_string()
    }
}

/// Position of a module in its workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleIndex(pub(crate) usize);

/// Start of a version token in a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextPosition {
    /// 1-based line
    pub line: usize,
    /// Byte offset of the token within its line
    pub column: usize,
}

impl TextPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Where a module's own version lives in its descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "at", rename_all = "snake_case")]
pub enum VersionSite {
    /// The version element's text starts here
    Token(TextPosition),
    /// No version element; a new one goes right after this line
    InsertAfter(usize),
}

impl VersionSite {
    pub fn line(&self) -> usize {
        match self {
            VersionSite::Token(position) => position.line,
            VersionSite::InsertAfter(line) => *line,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, VersionSite::InsertAfter(_))
    }
}

/// Parent reference declared by a module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentRef {
    pub coordinates: Coordinates,
    pub version: String,
    /// Start of the parent's version text, if the parent block declares one
    pub version_position: Option<TextPosition>,
    /// The workspace module this parent resolves to
    pub resolved: Option<ModuleIndex>,
}

impl ParentRef {
    pub fn new(coordinates: Coordinates, version: impl Into<String>) -> Self {
        Self {
            coordinates,
            version: version.into(),
            version_position: None,
            resolved: None,
        }
    }
}

/// A dependency entry, keyed by its position in the descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    pub coordinates: Coordinates,
    /// Declared version; `None` when managed elsewhere
    pub version: Option<String>,
    pub version_position: Option<TextPosition>,
    /// The workspace module this dependency resolves to (None = external)
    pub resolved: Option<ModuleIndex>,
}

impl Dependency {
    pub fn new(coordinates: Coordinates, version: Option<String>) -> Self {
        Self {
            coordinates,
            version,
            version_position: None,
            resolved: None,
        }
    }

    /// Returns true if this dependency points into the workspace
    pub fn is_internal(&self) -> bool {
        self.resolved.is_some()
    }
}

/// One workspace module (one descriptor file)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    /// Descriptor file this module was read from
    pub path: PathBuf,
    pub coordinates: Coordinates,
    /// Current version (declared, inherited from the parent, or placeholder)
    pub version: String,
    pub version_site: Option<VersionSite>,
    /// Scheduled for a new version
    pub dirty: bool,
    pub base_version: Option<String>,
    pub next_revision_id: Option<String>,
    pub parent: Option<ParentRef>,
    pub dependencies: Vec<Dependency>,
}

impl Module {
    /// Creates a module that is not backed by a descriptor line map
    pub fn new(coordinates: Coordinates, version: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            coordinates,
            version: version.into(),
            version_site: None,
            dirty: false,
            base_version: None,
            next_revision_id: None,
            parent: None,
            dependencies: Vec::new(),
        }
    }

    /// Returns true if the descriptor has no version element of its own
    pub fn insert_version_tag(&self) -> bool {
        self.version_site.is_some_and(|site| site.is_insert())
    }

    /// Returns the line of the version token (or insertion anchor)
    pub fn version_line(&self) -> Option<usize> {
        self.version_site.map(|site| site.line())
    }

    /// Returns the parent's version line, if any
    pub fn parent_version_line(&self) -> Option<usize> {
        self.parent
            .as_ref()
            .and_then(|p| p.version_position)
            .map(|position| position.line)
    }

    /// Marks the module dirty with its new base version and revision
    pub fn mark_dirty(&mut self, base_version: impl Into<String>, revision: impl Into<String>) {
        self.dirty = true;
        self.base_version = Some(base_version.into());
        self.next_revision_id = Some(revision.into());
    }

    /// Returns the version this module will carry after the update
    ///
    /// `None` unless the module is dirty with base version and revision set.
    pub fn next_version(&self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        match (&self.base_version, &self.next_revision_id) {
            (Some(base), Some(revision)) => Some(version::compose(base, revision)),
            _ => None,
        }
    }

    /// Returns the version after the update, or the current one
    pub fn final_version(&self) -> String {
        self.next_version().unwrap_or_else(|| self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_coordinates() {
        let coords: Coordinates = "at.nonblocking:test1".parse().unwrap();
        assert_eq!(coords.group_id, "at.nonblocking");
        assert_eq!(coords.artifact_id, "test1");
        assert_eq!(coords.to_string(), "at.nonblocking:test1");
    }

    #[test]
    fn invalid_coordinates() {
        assert!("test1".parse::<Coordinates>().is_err());
        assert!(":test1".parse::<Coordinates>().is_err());
        assert!("a:b:c".parse::<Coordinates>().is_err());
    }

    #[test]
    fn coordinates_serde_as_string() {
        let coords = Coordinates::new("g", "a");
        let json = serde_json::to_string(&coords).unwrap();
        assert_eq!(json, "\"g:a\"");

        let back: Coordinates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coords);
    }

    #[test]
    fn clean_module_has_no_next_version() {
        let module = Module::new(Coordinates::new("g", "a"), "1.0.0");
        assert_eq!(module.next_version(), None);
        assert_eq!(module.final_version(), "1.0.0");
    }

    #[test]
    fn dirty_module_composes_next_version() {
        let mut module = Module::new(Coordinates::new("g", "a"), "1.0.0");
        module.mark_dirty("1.1.1", "12345");

        assert_eq!(module.next_version().as_deref(), Some("1.1.1-12345"));
        assert_eq!(module.final_version(), "1.1.1-12345");
    }

    #[test]
    fn dirty_without_assignment_has_no_next_version() {
        let mut module = Module::new(Coordinates::new("g", "a"), "1.0.0");
        module.dirty = true;
        assert_eq!(module.next_version(), None);
    }

    #[test]
    fn parent_version_line_comes_from_position() {
        let mut module = Module::new(Coordinates::new("g", "a"), "1.0.0");
        let mut parent = ParentRef::new(Coordinates::new("g", "parent"), "2.0.0");
        parent.version_position = Some(TextPosition::new(9, 17));
        module.parent = Some(parent);

        assert_eq!(module.parent_version_line(), Some(9));
    }

    #[test]
    fn version_site_helpers() {
        let mut module = Module::new(Coordinates::new("g", "a"), "1.0.0");
        assert!(!module.insert_version_tag());
        assert_eq!(module.version_line(), None);

        module.version_site = Some(VersionSite::InsertAfter(7));
        assert!(module.insert_version_tag());
        assert_eq!(module.version_line(), Some(7));
    }
}
