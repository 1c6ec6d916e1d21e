//! Descriptor reader
//!
//! Reads `pom.xml` descriptors into [`Module`] records. Two independent
//! passes run over the same text:
//!
//! 1. A structural pass (serde via quick-xml) for identity, parent and
//!    dependency values.
//! 2. A location pass (quick-xml event reader over the raw bytes) that maps
//!    every relevant `<version>` text to its line and byte column.
//!
//! The writer only ever touches the lines found by the second pass, so no
//! XML serializer is involved in rewriting a file.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    Coordinates, Dependency, Module, ParentRef, TextPosition, VersionSite, PLACEHOLDER_VERSION,
};

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Descriptor not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: expected version '{expected}' on this line", path.display())]
    StaleLocation {
        path: PathBuf,
        line: usize,
        expected: String,
    },
}

impl DescriptorError {
    pub(crate) fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Returns the file the error refers to
    pub fn path(&self) -> &Path {
        match self {
            DescriptorError::NotFound(path) => path,
            DescriptorError::Parse { path, .. }
            | DescriptorError::Io { path, .. }
            | DescriptorError::StaleLocation { path, .. } => path,
        }
    }
}

// Structural view of the schema subset we care about

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomDocument {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    parent: Option<PomParent>,
    #[serde(default)]
    dependencies: PomDependencies,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomParent {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PomDependencies {
    #[serde(rename = "dependency", default)]
    entries: Vec<PomDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
}

/// Byte offset to line/column mapping (1-based lines, byte columns)
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(content: &[u8]) -> Self {
        Self {
            newlines: content
                .iter()
                .enumerate()
                .filter_map(|(pos, b)| (*b == b'\n').then_some(pos))
                .collect(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }

    fn position_of(&self, offset: usize) -> TextPosition {
        let line = self.line_of(offset);
        let line_start = match line {
            1 => 0,
            _ => self.newlines[line - 2] + 1,
        };
        TextPosition::new(line, offset - line_start)
    }
}

/// Token positions found by the location pass
#[derive(Debug, Default)]
struct Locations {
    /// Line holding the closing tag of the module's artifactId
    artifact_id_end_line: Option<usize>,
    version: Option<TextPosition>,
    parent_version: Option<TextPosition>,
    dependency_versions: Vec<Option<TextPosition>>,
    empty_version: bool,
    empty_parent_version: bool,
}

/// Slot the next version text belongs to
#[derive(Debug, Clone, Copy)]
enum VersionSlot {
    Module,
    Parent,
    Dependency,
}

const PROJECT_VERSION: &[&str] = &["project", "version"];
const PROJECT_ARTIFACT_ID: &[&str] = &["project", "artifactId"];
const PARENT_VERSION: &[&str] = &["project", "parent", "version"];
const DEPENDENCY: &[&str] = &["project", "dependencies", "dependency"];
const DEPENDENCY_VERSION: &[&str] = &["project", "dependencies", "dependency", "version"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn at(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

impl Locations {
    fn mark_empty(&mut self, path: &[String]) {
        if at(path, PROJECT_VERSION) {
            self.empty_version = true;
        } else if at(path, PARENT_VERSION) {
            self.empty_parent_version = true;
        }
    }
}

/// Finds the version tokens and the end of the module's artifactId
///
/// Runs over the raw bytes, so positions are byte offsets in the file as
/// stored, whatever its encoding.
fn locate(content: &[u8]) -> Result<Locations, String> {
    let lines = LineIndex::new(content);
    let mut reader = Reader::from_reader(content);
    let mut path: Vec<String> = Vec::new();
    let mut locations = Locations::default();
    let mut pending: Option<VersionSlot> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| {
            format!(
                "line {}: {}",
                lines.line_of(reader.error_position() as usize),
                e
            )
        })?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() && name != "project" {
                    return Err(format!("expected <project> root element, found <{}>", name));
                }
                path.push(name);

                if at(&path, PROJECT_VERSION) {
                    pending = Some(VersionSlot::Module);
                } else if at(&path, PARENT_VERSION) {
                    pending = Some(VersionSlot::Parent);
                } else if at(&path, DEPENDENCY) {
                    locations.dependency_versions.push(None);
                } else if at(&path, DEPENDENCY_VERSION) {
                    pending = Some(VersionSlot::Dependency);
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.push(name);
                if at(&path, DEPENDENCY) {
                    locations.dependency_versions.push(None);
                }
                locations.mark_empty(&path);
                path.pop();
            }
            Event::Text(text) => {
                let Some(slot) = pending else {
                    continue;
                };
                let Some(offset) = text.iter().position(|b| !b.is_ascii_whitespace()) else {
                    continue;
                };
                let position = lines.position_of(before + offset);
                match slot {
                    VersionSlot::Module => locations.version = Some(position),
                    VersionSlot::Parent => locations.parent_version = Some(position),
                    VersionSlot::Dependency => {
                        if let Some(last) = locations.dependency_versions.last_mut() {
                            *last = Some(position);
                        }
                    }
                }
                pending = None;
            }
            Event::End(_) => {
                if pending.take().is_some() {
                    locations.mark_empty(&path);
                }
                if at(&path, PROJECT_ARTIFACT_ID) {
                    locations.artifact_id_end_line = Some(lines.line_of(before));
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locations)
}

/// Decodes descriptor bytes using the encoding named in the XML declaration
fn decode(content: &[u8]) -> Result<Cow<'_, str>, String> {
    if content.starts_with(b"\xFF\xFE") || content.starts_with(b"\xFE\xFF") {
        return Err("UTF-16 descriptors are not supported".to_string());
    }

    // Reading the declaration switches the reader's decoder to its encoding
    let mut reader = Reader::from_reader(content);
    if let Err(e) = reader.read_event() {
        return Err(e.to_string());
    }

    let decoder = reader.decoder();
    if !decoder.encoding().is_ascii_compatible() {
        return Err(format!(
            "unsupported descriptor encoding {}",
            decoder.encoding().name()
        ));
    }

    decoder.decode(content).map_err(|e| e.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses raw descriptor bytes read from `path` into a module
pub fn parse_module(path: &Path, content: &[u8]) -> Result<Module, DescriptorError> {
    let bom = if content.starts_with(UTF8_BOM) { UTF8_BOM.len() } else { 0 };
    let body = &content[bom..];

    let locations = locate(body).map_err(|message| DescriptorError::parse(path, message))?;
    if locations.empty_version {
        return Err(DescriptorError::parse(path, "module <version> element is empty"));
    }
    if locations.empty_parent_version {
        return Err(DescriptorError::parse(path, "parent <version> element is empty"));
    }

    let text = decode(body).map_err(|message| DescriptorError::parse(path, message))?;
    let document: PomDocument =
        quick_xml::de::from_str(&text).map_err(|e| DescriptorError::parse(path, e.to_string()))?;

    let shift = |mut position: TextPosition| {
        if position.line == 1 {
            position.column += bom;
        }
        position
    };

    let parent = match document.parent {
        Some(p) => {
            let version = non_empty(p.version);
            if version.is_some() && locations.parent_version.is_none() {
                return Err(DescriptorError::parse(path, "parent version could not be located"));
            }
            let mut parent = ParentRef::new(
                Coordinates::new(p.group_id.trim(), p.artifact_id.trim()),
                version.unwrap_or_default(),
            );
            parent.version_position = locations.parent_version.map(shift);
            Some(parent)
        }
        None => None,
    };

    let artifact_id =
        non_empty(document.artifact_id).ok_or_else(|| DescriptorError::parse(path, "missing artifactId"))?;
    let group_id = non_empty(document.group_id)
        .or_else(|| parent.as_ref().map(|p| p.coordinates.group_id.clone()))
        .ok_or_else(|| DescriptorError::parse(path, "missing groupId and no parent to inherit it from"))?;

    let (version, version_site) = match non_empty(document.version) {
        Some(version) => {
            let position = locations
                .version
                .ok_or_else(|| DescriptorError::parse(path, "version could not be located"))?;
            (version, VersionSite::Token(shift(position)))
        }
        None => {
            let line = locations
                .artifact_id_end_line
                .ok_or_else(|| DescriptorError::parse(path, "artifactId could not be located"))?;
            let inherited = parent
                .as_ref()
                .map(|p| p.version.clone())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_VERSION.to_string());
            (inherited, VersionSite::InsertAfter(line))
        }
    };

    let entries = document.dependencies.entries;
    if entries.len() != locations.dependency_versions.len() {
        return Err(DescriptorError::parse(
            path,
            format!(
                "found {} dependencies but located {}",
                entries.len(),
                locations.dependency_versions.len()
            ),
        ));
    }

    let mut dependencies = Vec::with_capacity(entries.len());
    for (pos, (entry, position)) in entries
        .into_iter()
        .zip(locations.dependency_versions)
        .enumerate()
    {
        let version = non_empty(entry.version);
        if version.is_some() && position.is_none() {
            return Err(DescriptorError::parse(
                path,
                format!("version of dependency {} could not be located", pos + 1),
            ));
        }
        let mut dependency = Dependency::new(
            Coordinates::new(entry.group_id.trim(), entry.artifact_id.trim()),
            version,
        );
        dependency.version_position = position.map(shift);
        dependencies.push(dependency);
    }

    let mut module = Module::new(Coordinates::new(group_id, artifact_id), version);
    module.path = path.to_path_buf();
    module.version_site = Some(version_site);
    module.parent = parent;
    module.dependencies = dependencies;

    debug!(
        path = %path.display(),
        module = %module.coordinates,
        version = %module.version,
        site = ?module.version_site,
        dependencies = module.dependencies.len(),
        "Read descriptor"
    );

    Ok(module)
}

/// Reads one descriptor file into a module
pub fn read_module(path: &Path) -> Result<Module, DescriptorError> {
    let bytes = fs::read(path).map_err(|e| DescriptorError::io(path, e))?;
    parse_module(path, &bytes)
}

/// Outcome of reading several descriptors
#[derive(Debug, Default)]
pub struct ReadReport {
    pub modules: Vec<Module>,
    pub failures: Vec<DescriptorError>,
}

/// Reads every descriptor, collecting per-file failures instead of stopping
pub fn read_modules<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> ReadReport {
    let mut report = ReadReport::default();

    for path in paths {
        match read_module(path.as_ref()) {
            Ok(module) => report.modules.push(module),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping descriptor");
                report.failures.push(e);
            }
        }
    }

    report
}
