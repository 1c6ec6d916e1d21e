//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Write a default `nonsnapshot.toml` |
//! | `show <POM>...` | List modules, their versions and workspace references |
//! | `plan <POM>... --dirty g:a` | Print the edits an update would make |
//! | `update <POM>... --dirty g:a` | Assign new versions and rewrite descriptors |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging on stderr, or set `RUST_LOG`:
//! ```bash
//! nonsnapshot --verbose plan pom.xml core/pom.xml --dirty org.example:core
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod show;
mod update;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
pub use update::UpdateArgs;
