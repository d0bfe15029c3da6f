//! # Solver Runtime Boundary
//!
//! The finite-element runtime itself lives outside this crate. A
//! [`SolverRuntime`] receives a finished artifact set and answers with a
//! success flag and an optional diagnostic, which is passed through untouched.
//!
//! [`submit`] refuses to call the runtime when the validation report carries
//! critical findings.
//!
//! ## Example
//!
//! ```rust
//! use frame_core::runtime::{submit, RuntimeOutcome, SolverRuntime};
//! use frame_core::{translate, ArtifactSet, BuildConfig, ModelResult};
//!
//! struct CountNodes;
//!
//! impl SolverRuntime for CountNodes {
//!     fn name(&self) -> &str {
//!         "count-nodes"
//!     }
//!
//!     fn check(&self, artifacts: &ArtifactSet) -> ModelResult<RuntimeOutcome> {
//!         Ok(RuntimeOutcome::passed(format!("{} nodes", artifacts.model.nodes.len())))
//!     }
//! }
//!
//! let text = r#"
//! $ STORIES
//!   STORY "L1" HEIGHT 3
//!   STORY "Base" ELEV 0
//! $ POINT COORDINATES
//!   POINT "1" 0 0
//! $ LINE CONNECTIVITIES
//!   LINE "C1" COLUMN "1" "1"
//! $ POINT ASSIGNS
//!   POINTASSIGN "1" "Base" RESTRAINT "UX UY UZ RX RY RZ"
//! $ LINE ASSIGNS
//!   LINEASSIGN "C1" "L1"
//! "#;
//!
//! let artifacts = translate(text, BuildConfig::default()).unwrap();
//! let check = submit(&CountNodes, &artifacts).unwrap();
//! assert!(check.outcome.success);
//! assert_eq!(check.outcome.diagnostic.as_deref(), Some("2 nodes"));
//! ```

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactSet;
use crate::errors::{ModelError, ModelResult};

/// What a runtime reported about a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOutcome {
    pub success: bool,
    /// Free text from the runtime, verbatim
    pub diagnostic: Option<String>,
    /// Error stream of a runtime that has one, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl RuntimeOutcome {
    pub fn passed(diagnostic: impl Into<String>) -> Self {
        RuntimeOutcome {
            success: true,
            diagnostic: Some(diagnostic.into()),
            stderr: None,
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        RuntimeOutcome {
            success: false,
            diagnostic: Some(diagnostic.into()),
            stderr: None,
        }
    }
}

/// Record of one submission, stored outside the artifact set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeCheck {
    pub runtime: String,
    pub outcome: RuntimeOutcome,
    pub checked_at: DateTime<Utc>,
}

/// A finite-element runtime able to check a finished model.
pub trait SolverRuntime {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Run the soundness check. `Err` means the runtime could not be run at all.
    fn check(&self, artifacts: &ArtifactSet) -> ModelResult<RuntimeOutcome>;
}

/// Hand a model to a runtime unless validation blocks it.
///
/// # Returns
///
/// * `Ok(RuntimeCheck)` - The runtime ran; see `outcome.success`
/// * `Err(ModelError::ExecutionBlocked)` - Critical findings, runtime not called
/// * `Err(_)` - The runtime itself failed to run
pub fn submit(runtime: &dyn SolverRuntime, artifacts: &ArtifactSet) -> ModelResult<RuntimeCheck> {
    if artifacts.blocks_execution() {
        let critical = artifacts.validation.critical_count();
        warn!(runtime = runtime.name(), critical = critical; "Submission refused");
        return Err(ModelError::ExecutionBlocked { critical });
    }

    let outcome = runtime.check(artifacts)?;
    info!(runtime = runtime.name(), success = outcome.success; "Runtime check finished");

    Ok(RuntimeCheck {
        runtime: runtime.name().to_string(),
        outcome,
        checked_at: Utc::now(),
    })
}

/// Runs an external command with the artifact JSON on stdin.
///
/// Exit status zero is success. Stdout becomes the diagnostic and stderr is
/// kept beside it; neither is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRuntime {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        CommandRuntime {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a command line on whitespace into program and arguments
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(CommandRuntime::new(program).with_args(words))
    }
}

impl SolverRuntime for CommandRuntime {
    fn name(&self) -> &str {
        &self.program
    }

    fn check(&self, artifacts: &ArtifactSet) -> ModelResult<RuntimeOutcome> {
        let json = artifacts.to_json()?.into_bytes();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ModelError::file_error("spawn runtime", &self.program, e.to_string()))?;

        // Feed stdin from its own thread while the output pipes are drained here
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(&json)));

        let output = child
            .wait_with_output()
            .map_err(|e| ModelError::file_error("wait for runtime", &self.program, e.to_string()))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // A runtime that exits without reading stdin closes the pipe early
                Ok(Err(e)) => warn!(runtime = self.program.as_str(); "Runtime closed stdin: {e}"),
                Err(_) => {
                    return Err(ModelError::file_error("write runtime stdin", &self.program, "writer thread panicked"));
                }
            }
        }

        let verbatim = |bytes: Vec<u8>| {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            (!text.is_empty()).then_some(text)
        };

        Ok(RuntimeOutcome {
            success: output.status.success(),
            diagnostic: verbatim(output.stdout),
            stderr: verbatim(output.stderr),
        })
    }
}
