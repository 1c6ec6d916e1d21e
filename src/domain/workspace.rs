//! Workspace graph
//!
//! Owns every module read in one run and resolves parent and dependency
//! references between them. Uses petgraph to mirror the references as
//! edges (referenced module -> referencing module).

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use super::module::{Coordinates, Module, ModuleIndex};
use super::strategy::{decide_dependency_version, decide_parent_version, UpdateStrategy};
use super::version;

#[derive(Debug, Error, PartialEq)]
pub enum WorkspaceError {
    #[error("Ambiguous module {coordinates}: declared by {} and {}", first.display(), second.display())]
    AmbiguousModule {
        coordinates: Coordinates,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Module not found in workspace: {0}")]
    UnknownModule(Coordinates),

    #[error("Cannot derive a base version for {coordinates} from '{version}'; set a base version")]
    UnresolvedBase {
        coordinates: Coordinates,
        version: String,
    },
}

/// Kind of reference an edge stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The referencing module declares the source as its parent
    Parent,
    /// The referencing module's dependency at this position
    Dependency(usize),
}

/// New version assignment handed to dirty modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAssignment {
    /// Base version to use; `None` keeps each module's current base
    pub base_version: Option<String>,
    pub revision: String,
}

impl VersionAssignment {
    pub fn new(base_version: Option<String>, revision: impl Into<String>) -> Self {
        Self {
            base_version,
            revision: revision.into(),
        }
    }

    /// Returns the base version for a module currently at `current_version`
    ///
    /// `None` if no base is configured and the current version is a
    /// property reference.
    pub fn base_for(&self, current_version: &str) -> Option<String> {
        match &self.base_version {
            Some(base) => Some(base.clone()),
            None if version::is_property_reference(current_version) => None,
            None => Some(version::decompose(current_version).0.to_string()),
        }
    }
}

/// All modules of one run, with references resolved
#[derive(Debug, Default)]
pub struct Workspace {
    modules: Vec<Module>,
    index: HashMap<Coordinates, ModuleIndex>,
    graph: DiGraph<ModuleIndex, EdgeKind>,
}

impl Workspace {
    /// Builds a workspace and resolves references between its modules
    ///
    /// References to coordinates outside the workspace stay unresolved.
    pub fn build(modules: Vec<Module>) -> Result<Self, WorkspaceError> {
        let mut workspace = Self {
            modules,
            index: HashMap::new(),
            graph: DiGraph::new(),
        };

        // First pass: register every module
        for (pos, module) in workspace.modules.iter().enumerate() {
            let idx = ModuleIndex(pos);
            if let Some(existing) = workspace.index.get(&module.coordinates) {
                return Err(WorkspaceError::AmbiguousModule {
                    coordinates: module.coordinates.clone(),
                    first: workspace.modules[existing.0].path.clone(),
                    second: module.path.clone(),
                });
            }
            workspace.index.insert(module.coordinates.clone(), idx);
            workspace.graph.add_node(idx);
        }

        // Second pass: resolve references and add edges
        let mut edges = Vec::new();
        for (pos, module) in workspace.modules.iter_mut().enumerate() {
            if let Some(parent) = module.parent.as_mut() {
                parent.resolved = workspace.index.get(&parent.coordinates).copied();
                if let Some(target) = parent.resolved {
                    edges.push((target, ModuleIndex(pos), EdgeKind::Parent));
                }
            }

            for (dep_pos, dependency) in module.dependencies.iter_mut().enumerate() {
                dependency.resolved = workspace.index.get(&dependency.coordinates).copied();
                if let Some(target) = dependency.resolved {
                    edges.push((target, ModuleIndex(pos), EdgeKind::Dependency(dep_pos)));
                }
            }
        }

        for (from, to, kind) in edges {
            workspace
                .graph
                .add_edge(NodeIndex::new(from.0), NodeIndex::new(to.0), kind);
        }

        debug!(
            modules = workspace.modules.len(),
            references = workspace.graph.edge_count(),
            "Built workspace graph"
        );

        Ok(workspace)
    }

    /// Returns all modules in read order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Returns the module at the given index
    pub fn get(&self, idx: ModuleIndex) -> Option<&Module> {
        self.modules.get(idx.0)
    }

    /// Looks up a module by coordinates
    pub fn find(&self, coordinates: &Coordinates) -> Option<ModuleIndex> {
        self.index.get(coordinates).copied()
    }

    /// Returns all module indices in read order
    pub fn indices(&self) -> impl Iterator<Item = ModuleIndex> {
        (0..self.modules.len()).map(ModuleIndex)
    }

    /// Returns the number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if the workspace has no modules
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns the number of resolved references
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Marks a module dirty with the given assignment
    pub fn mark_dirty(
        &mut self,
        coordinates: &Coordinates,
        assignment: &VersionAssignment,
    ) -> Result<ModuleIndex, WorkspaceError> {
        let idx = self
            .find(coordinates)
            .ok_or_else(|| WorkspaceError::UnknownModule(coordinates.clone()))?;

        let module = &mut self.modules[idx.0];
        let base = assignment.base_for(&module.version).ok_or_else(|| {
            WorkspaceError::UnresolvedBase {
                coordinates: module.coordinates.clone(),
                version: module.version.clone(),
            }
        })?;
        module.mark_dirty(base, assignment.revision.clone());
        debug!(module = %module.coordinates, next = ?module.next_version(), "Marked module dirty");

        Ok(idx)
    }

    /// Marks clean modules dirty when one of their references will change
    ///
    /// A parent reference always changes when the parent is dirty; a
    /// dependency reference changes when `strategy` accepts the move.
    /// Repeats until no module changes. Returns the newly dirty modules.
    pub fn propagate_dirty(
        &mut self,
        strategy: UpdateStrategy,
        assignment: &VersionAssignment,
    ) -> Vec<Coordinates> {
        let mut queue: VecDeque<ModuleIndex> =
            self.indices().filter(|idx| self.modules[idx.0].dirty).collect();
        let mut newly_dirty = Vec::new();

        while let Some(source) = queue.pop_front() {
            let edges: Vec<(ModuleIndex, EdgeKind)> = self
                .graph
                .edges_directed(NodeIndex::new(source.0), Direction::Outgoing)
                .filter_map(|edge| {
                    self.graph
                        .node_weight(edge.target())
                        .map(|target| (*target, *edge.weight()))
                })
                .collect();

            for (dependent, kind) in edges {
                if self.modules[dependent.0].dirty {
                    continue;
                }
                if !self.reference_changes(source, dependent, kind, strategy) {
                    continue;
                }

                let Some(base) = assignment.base_for(&self.modules[dependent.0].version) else {
                    warn!(
                        module = %self.modules[dependent.0].coordinates,
                        version = %self.modules[dependent.0].version,
                        "Cannot derive a base version, not propagating"
                    );
                    continue;
                };
                self.modules[dependent.0].mark_dirty(base, assignment.revision.clone());

                let coordinates = self.modules[dependent.0].coordinates.clone();
                debug!(
                    module = %coordinates,
                    because = %self.modules[source.0].coordinates,
                    "Propagated dirty flag"
                );

                newly_dirty.push(coordinates);
                queue.push_back(dependent);
            }
        }

        newly_dirty
    }

    /// Returns true if `dependent`'s reference to `source` would be rewritten
    fn reference_changes(
        &self,
        source: ModuleIndex,
        dependent: ModuleIndex,
        kind: EdgeKind,
        strategy: UpdateStrategy,
    ) -> bool {
        let target = &self.modules[source.0];
        let module = &self.modules[dependent.0];

        match kind {
            EdgeKind::Parent => match module.parent.as_ref() {
                Some(parent) if version::is_property_reference(&parent.version) => false,
                Some(parent) => decide_parent_version(&parent.version, target)
                    .is_some_and(|next| next != parent.version),
                None => false,
            },
            EdgeKind::Dependency(pos) => {
                let Some(dependency) = module.dependencies.get(pos) else {
                    return false;
                };
                match dependency.version.as_deref() {
                    Some(declared) if !version::is_property_reference(declared) => {
                        decide_dependency_version(declared, target, strategy)
                            .is_some_and(|next| next != declared)
                    }
                    _ => false,
                }
            }
        }
    }
}
