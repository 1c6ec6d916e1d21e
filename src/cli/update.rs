//! Plan and update commands

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{debug, warn};

use super::output::Output;
use crate::domain::{
    plan_all, Coordinates, EditKind, EditTarget, UpdatePlan, UpdateStrategy, VersionAssignment,
    VersionEdit, Workspace,
};
use crate::storage::{apply_updates, read_modules, Config, DescriptorError, ProjectConfig};

/// Arguments shared by `plan` and `update`
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Descriptor files of the workspace
    #[arg(required = true, value_name = "POM")]
    pub poms: Vec<PathBuf>,

    /// Changed module as groupId:artifactId (repeatable)
    #[arg(long, short = 'd', value_name = "GROUP:ARTIFACT")]
    pub dirty: Vec<Coordinates>,

    /// Treat every module as changed
    #[arg(long, conflicts_with = "dirty")]
    pub all: bool,

    /// Dependency update strategy (overrides nonsnapshot.toml)
    #[arg(long, short = 's')]
    pub strategy: Option<UpdateStrategy>,

    /// Base version for changed modules (defaults to each module's current base)
    #[arg(long, env = "NONSNAPSHOT_BASE_VERSION")]
    pub base_version: Option<String>,

    /// Revision identifier (defaults to a UTC timestamp)
    #[arg(long, env = "NONSNAPSHOT_REVISION")]
    pub revision: Option<String>,

    /// Only update the modules given with --dirty
    #[arg(long)]
    pub no_propagate: bool,
}

/// Result of classifying a workspace, before anything is written
struct Prepared {
    workspace: Workspace,
    failures: Vec<DescriptorError>,
    propagated: Vec<Coordinates>,
    plans: Vec<UpdatePlan>,
    strategy: UpdateStrategy,
}

/// Merges command line overrides into the project config
fn effective_settings(
    args: &UpdateArgs,
    config: &Config,
) -> Result<(UpdateStrategy, VersionAssignment, bool)> {
    let overrides = ProjectConfig {
        strategy: args.strategy.unwrap_or(config.project.strategy),
        base_version: args
            .base_version
            .clone()
            .or_else(|| config.project.base_version.clone()),
        revision: args.revision.clone().or_else(|| config.project.revision.clone()),
        propagate: config.project.propagate && !args.no_propagate,
    };
    overrides.validate()?;

    let revision = match overrides.revision {
        Some(revision) => revision,
        None => config.revision(),
    };

    Ok((
        overrides.strategy,
        VersionAssignment::new(overrides.base_version, revision),
        overrides.propagate,
    ))
}

/// Reads the workspace, marks dirty modules and plans every file
fn prepare(args: &UpdateArgs, config: &Config) -> Result<Prepared> {
    let (strategy, assignment, propagate) = effective_settings(args, config)?;
    debug!(strategy = %strategy, revision = %assignment.revision, propagate, "Effective settings");

    let report = read_modules(&args.poms);
    let mut workspace = Workspace::build(report.modules).context("Failed to build workspace")?;

    let dirty: Vec<Coordinates> = if args.all {
        workspace
            .modules()
            .iter()
            .map(|m| m.coordinates.clone())
            .collect()
    } else {
        args.dirty.clone()
    };

    for coordinates in &dirty {
        workspace
            .mark_dirty(coordinates, &assignment)
            .with_context(|| format!("Cannot mark {} as changed", coordinates))?;
    }

    let propagated = if propagate {
        workspace.propagate_dirty(strategy, &assignment)
    } else {
        Vec::new()
    };

    // Every file is classified before any file is written
    let plans = plan_all(&workspace, strategy);

    Ok(Prepared {
        workspace,
        failures: report.failures,
        propagated,
        plans,
        strategy,
    })
}

fn describe_target(target: &EditTarget) -> String {
    match target {
        EditTarget::Module => "version".to_string(),
        EditTarget::Parent => "parent".to_string(),
        EditTarget::Dependency(coordinates) => format!("dependency {}", coordinates),
    }
}

fn describe_edit(edit: &VersionEdit) -> String {
    match &edit.kind {
        EditKind::Replace { current } => format!(
            "line {}: {} -> {} ({})",
            edit.line,
            current,
            edit.new_version,
            describe_target(&edit.target)
        ),
        EditKind::InsertAfter => format!(
            "after line {}: insert {} ({})",
            edit.line,
            edit.new_version,
            describe_target(&edit.target)
        ),
    }
}

fn failure_json(failure: &DescriptorError) -> serde_json::Value {
    serde_json::json!({
        "path": failure.path().display().to_string(),
        "error": failure.to_string(),
    })
}

fn print_plan(plan: &UpdatePlan) {
    println!("{} -> {} ({})", plan.module, plan.final_version, plan.path.display());
    for edit in &plan.edits {
        println!("  {}", describe_edit(edit));
    }
}

/// Shows the edits an update would make, without writing
pub fn plan(output: &Output, args: &UpdateArgs, config: &Config) -> Result<()> {
    let prepared = prepare(args, config)?;
    for failure in &prepared.failures {
        output.error(&failure.to_string());
    }

    let changes: Vec<&UpdatePlan> = prepared.plans.iter().filter(|p| !p.is_empty()).collect();

    if output.is_json() {
        output.data(&serde_json::json!({
            "strategy": prepared.strategy,
            "propagated": prepared.propagated,
            "plans": changes,
            "failed": prepared.failures.iter().map(failure_json).collect::<Vec<_>>(),
        }));
    } else if changes.is_empty() {
        println!("Nothing to update.");
    } else {
        for plan in &changes {
            print_plan(plan);
        }
        if !prepared.propagated.is_empty() {
            println!();
            let names: Vec<String> = prepared.propagated.iter().map(|c| c.to_string()).collect();
            println!("Also changed through references: {}", names.join(", "));
        }
    }

    if !prepared.failures.is_empty() {
        bail!("{} descriptor(s) could not be read", prepared.failures.len());
    }

    Ok(())
}

/// Rewrites every descriptor whose plan is not empty
///
/// A file that fails to read or write is reported and skipped; the other
/// files are still updated. The command fails if any file failed.
pub fn update(output: &Output, args: &UpdateArgs, config: &Config) -> Result<()> {
    let prepared = prepare(args, config)?;
    let mut failures = prepared.failures;
    for failure in &failures {
        output.error(&failure.to_string());
    }

    let mut updated = Vec::new();
    let mut unchanged = 0usize;

    for plan in &prepared.plans {
        match apply_updates(plan) {
            Ok(true) => updated.push(plan),
            Ok(false) => unchanged += 1,
            Err(e) => {
                warn!(path = %plan.path.display(), error = %e, "Descriptor update failed");
                output.error(&e.to_string());
                failures.push(e);
            }
        }
    }

    if output.is_json() {
        let modules: Vec<_> = prepared
            .workspace
            .modules()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "module": m.coordinates,
                    "version": m.final_version(),
                    "dirty": m.dirty,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "updated": updated.iter().map(|p| p.path.display().to_string()).collect::<Vec<_>>(),
            "unchanged": unchanged,
            "failed": failures.iter().map(failure_json).collect::<Vec<_>>(),
            "modules": modules,
        }));
    } else {
        for plan in &updated {
            println!("Updated {} to {} ({})", plan.module, plan.final_version, plan.path.display());
        }
        output.success(&format!(
            "{} file(s) updated, {} unchanged",
            updated.len(),
            unchanged
        ));
    }

    if !failures.is_empty() {
        bail!("{} descriptor(s) failed", failures.len());
    }

    Ok(())
}
