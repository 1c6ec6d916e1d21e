//! # Storage Layer
//!
//! Reads and rewrites descriptor files, and loads configuration.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Modules | `pom.xml` descriptors | paths given on the command line |
//! | Project config | TOML | `nonsnapshot.toml` (current dir or a parent) |
//! | Global config | TOML | `~/.config/nonsnapshot/config.toml` |
//!
//! ## Write Safety
//!
//! - Descriptors are edited in place at recorded positions; other bytes are copied verbatim
//! - All writes are atomic (locked temp file + rename)
//! - An empty update plan never opens the file
//!
//! ## Key Types
//!
//! - [`read_module`] - Parse one descriptor into a [`Module`](crate::domain::Module)
//! - [`apply_updates`] - Apply an [`UpdatePlan`](crate::domain::UpdatePlan) to its file
//! - [`Config`] - Project and global configuration

mod descriptor;
mod writer;
mod config;

pub use descriptor::{parse_module, read_module, read_modules, DescriptorError, ReadReport};
pub use writer::{apply_updates, render};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PROJECT_CONFIG_FILE};
