//! Show command: list the modules of a workspace

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{Module, Workspace};
use crate::storage::read_modules;

fn site_label(module: &Module) -> String {
    match module.version_line() {
        Some(line) if module.insert_version_tag() => format!("+{}", line),
        Some(line) => line.to_string(),
        None => "-".to_string(),
    }
}

/// Reads the descriptors and prints the resolved workspace
pub fn run(output: &Output, poms: &[PathBuf]) -> Result<()> {
    let report = read_modules(poms);
    for failure in &report.failures {
        output.error(&failure.to_string());
    }

    let workspace = Workspace::build(report.modules).context("Failed to build workspace")?;
    tracing::debug!(
        modules = workspace.len(),
        references = workspace.reference_count(),
        "Resolved workspace"
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "modules": workspace.modules(),
            "failed": report
                .failures
                .iter()
                .map(|f| serde_json::json!({
                    "path": f.path().display().to_string(),
                    "error": f.to_string(),
                }))
                .collect::<Vec<_>>(),
        }));
    } else if workspace.is_empty() {
        println!("No modules found.");
    } else {
        println!("{:<45} {:<20} {:<6} FILE", "MODULE", "VERSION", "LINE");
        println!("{}", "-".repeat(90));

        for module in workspace.modules() {
            println!(
                "{:<45} {:<20} {:<6} {}",
                module.coordinates.to_string(),
                module.version,
                site_label(module),
                module.path.display()
            );

            if let Some(parent) = &module.parent {
                let scope = if parent.resolved.is_some() { "workspace" } else { "external" };
                println!("    parent {} {} ({})", parent.coordinates, parent.version, scope);
            }

            for dependency in module.dependencies.iter().filter(|d| d.is_internal()) {
                println!(
                    "    depends on {} {}",
                    dependency.coordinates,
                    dependency.version.as_deref().unwrap_or("(managed)")
                );
            }
        }

        println!();
        println!(
            "{} module(s), {} workspace reference(s)",
            workspace.len(),
            workspace.reference_count()
        );
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} descriptor(s) could not be read", report.failures.len());
    }

    Ok(())
}
