//! nonsnapshot - fixed release versions for changed modules
//!
//! Reads a set of Maven `pom.xml` descriptors, resolves which modules
//! reference each other, gives every changed module a new
//! `<base>-<revision>` version and rewrites the version text of the
//! affected descriptors in place. Dependency references follow a
//! configurable [`UpdateStrategy`]; parent references always follow.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Coordinates, Module, UpdatePlan, UpdateStrategy, Workspace};
