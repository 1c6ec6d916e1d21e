//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::update::UpdateArgs;
use super::{show, update};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "nonsnapshot")]
#[command(
    author,
    version,
    about = "Replaces snapshot versions of changed modules with fixed release versions"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, else text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default nonsnapshot.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List modules, versions and workspace references
    Show {
        /// Descriptor files of the workspace
        #[arg(required = true, value_name = "POM")]
        poms: Vec<PathBuf>,
    },

    /// Show the edits an update would make
    Plan(UpdateArgs),

    /// Assign new versions and rewrite the descriptors
    Update(UpdateArgs),
}

/// Installs the tracing subscriber on stderr
///
/// `RUST_LOG` wins; otherwise `--verbose` enables debug output for this crate.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("nonsnapshot=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    // A second init (tests running in one process) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    let output = Output::new(cli.format.unwrap_or(config.global.default_format));
    tracing::debug!(project_root = ?config.project_root, "nonsnapshot starting");

    match cli.command {
        Commands::Init { path } => {
            let config_path = Config::init_project(&path)?;
            output.success(&format!("Created {}", config_path.display()));
        }
        Commands::Show { poms } => show::run(&output, &poms)?,
        Commands::Plan(args) => update::plan(&output, &args, &config)?,
        Commands::Update(args) => update::update(&output, &args, &config)?,
    }

    tracing::debug!("Command completed successfully");
    Ok(())
}
