//! CLI logic for the storyframe translator.
//!
//! [`run`] reads the model, builds and validates the artifact set, writes it
//! out, prints a summary and optionally hands the model to a solver command.

mod args;
mod config;

pub use args::Args;

use std::path::Path;

use log::info;

use frame_core::file_io::{load_source, save_artifacts};
use frame_core::runtime::{submit, RuntimeCheck};
use frame_core::validation::{Check, Severity};
use frame_core::{translate, ArtifactSet, CommandRuntime, ModelError, ModelResult};

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Artifacts written, nothing blocks execution
    Passed,
    /// Artifacts written, critical findings block execution
    Blocked,
    /// The solver command ran and reported failure
    RuntimeRejected,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::Blocked => 2,
            RunStatus::RuntimeRejected => 3,
        }
    }
}

/// Run the storyframe CLI application
///
/// # Errors
///
/// Returns `ModelError` for:
/// - File I/O and configuration errors
/// - Malformed records and undefined references
/// - A solver command that cannot be started
pub fn run(args: &Args) -> ModelResult<RunStatus> {
    info!(input = args.input.as_str(), output = args.output.as_str(); "Translating model");

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    let source = load_source(Path::new(&args.input))?;
    let artifacts = translate(&source, config)?;
    save_artifacts(&artifacts, Path::new(&args.output))?;
    info!(output = args.output.as_str(); "Artifact set written");

    print_summary(&artifacts);

    if artifacts.blocks_execution() {
        return Ok(RunStatus::Blocked);
    }

    let Some(command) = &args.runtime else {
        return Ok(RunStatus::Passed);
    };
    let runtime = CommandRuntime::parse(command)
        .ok_or_else(|| ModelError::file_error("parse runtime command", command, "empty command"))?;
    let check = submit(&runtime, &artifacts)?;
    print_runtime(&check);

    Ok(if check.outcome.success {
        RunStatus::Passed
    } else {
        RunStatus::RuntimeRejected
    })
}

fn print_summary(artifacts: &ArtifactSet) {
    let model = &artifacts.model;
    let report = &artifacts.validation;

    println!("═══════════════════════════════════════");
    println!("  FRAME MODEL ({})", artifacts.strategy);
    println!("═══════════════════════════════════════");
    println!();
    println!("Model:");
    println!("  Stories:     {}", model.stories.len());
    println!("  Nodes:       {}", model.nodes.len());
    println!("  Elements:    {}", model.elements.len());
    println!("  Diaphragms:  {}", model.diaphragms.len());
    println!("  Springs:     {}", model.springs.connectors.len());
    println!("  Supports:    {} ({} DOFs)", model.supports.len(), report.restrained_dofs);
    println!();

    if !artifacts.skips.is_empty() || !artifacts.conflicts.is_empty() {
        println!("Skipped:");
        for skip in artifacts.skips.iter().chain(&artifacts.conflicts) {
            println!("  [{}] {}", skip.error_code(), skip);
        }
        println!();
    }

    println!("Checks:");
    for check in Check::ALL {
        println!(
            "  {:<24} {:>3} {}",
            check.name(),
            report.findings_for(check).count(),
            status_icon(report.passed(check))
        );
    }
    println!();

    let notable: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.severity > Severity::Info)
        .collect();
    if !notable.is_empty() {
        println!("Findings:");
        for finding in notable {
            println!("  {:<8} {}", finding.severity.to_string(), finding.message);
        }
        println!();
    }

    println!("═══════════════════════════════════════");
    println!(
        "  RESULT: {} ({} critical, {} warning)",
        if artifacts.blocks_execution() { "BLOCKED" } else { "READY" },
        report.critical_count(),
        report.count(Severity::Warning)
    );
    println!("═══════════════════════════════════════");
}

fn print_runtime(check: &RuntimeCheck) {
    println!();
    println!(
        "Runtime '{}': {} at {}",
        check.runtime,
        status_icon(check.outcome.success),
        check.checked_at.to_rfc3339()
    );
    if let Some(diagnostic) = &check.outcome.diagnostic {
        for line in diagnostic.lines() {
            println!("  {line}");
        }
    }
    if let Some(stderr) = &check.outcome.stderr {
        for line in stderr.lines() {
            eprintln!("  {line}");
        }
    }
}

fn status_icon(pass: bool) -> &'static str {
    if pass { "[OK]" } else { "[FAIL]" }
}
