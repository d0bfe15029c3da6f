//! # frame_core - Story Model to Finite-Element Graph Translation
//!
//! `frame_core` reads a story-organized building model (stories, plan points,
//! line members, assignments) and translates it into the nodes, elements and
//! constraints of a three-dimensional frame model. The result is validated for
//! connectivity and restraint before anything is handed to a solver.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: Same input, same tags, same bytes
//! - **JSON-First**: Every artifact implements Serialize/Deserialize
//! - **Rich Errors**: Structured error types naming the offending record
//! - **Skip, don't abort**: One bad member never sinks the whole model
//!
//! ## Quick Start
//!
//! ```rust
//! use frame_core::{translate, BuildConfig};
//!
//! let text = r#"
//! $ STORIES
//!   STORY "Roof" HEIGHT 4
//!   STORY "Base" ELEV 0
//! $ POINT COORDINATES
//!   POINT "1" 0 0
//!   POINT "2" 8 0
//! $ LINE CONNECTIVITIES
//!   LINE "C1" COLUMN "1" "1"
//!   LINE "C2" COLUMN "2" "2"
//!   LINE "B1" BEAM "1" "2"
//! $ POINT ASSIGNS
//!   POINTASSIGN "1" "Base" RESTRAINT "UX UY UZ RX RY RZ"
//!   POINTASSIGN "2" "Base" RESTRAINT "UX UY UZ RX RY RZ"
//! $ LINE ASSIGNS
//!   LINEASSIGN "C1" "Roof"
//!   LINEASSIGN "C2" "Roof"
//!   LINEASSIGN "B1" "Roof"
//! "#;
//!
//! let artifacts = translate(text, BuildConfig::default()).unwrap();
//! assert_eq!(artifacts.model.elements.len(), 3);
//! assert!(!artifacts.blocks_execution());
//!
//! let json = artifacts.to_json().unwrap();
//! assert!(json.contains("\"schema_version\""));
//! ```
//!
//! ## Modules
//!
//! - [`parser`] - Sectioned text records
//! - [`story`] - Story graph and active (point, story) and (line, story) pairs
//! - [`nodes`] - Tag scheme, node registry and coordinate resolution
//! - [`elements`] - Frame elements, rigid end handling and sections
//! - [`constraints`] - Supports, springs and rigid diaphragms
//! - [`validation`] - Connectivity and restraint checks
//! - [`pipeline`] - Build order and the artifact set
//! - [`runtime`] - Handing a validated model to a solver
//! - [`file_io`] - Source loading and atomic artifact saves

pub mod artifacts;
pub mod config;
pub mod constraints;
pub mod elements;
pub mod errors;
pub mod file_io;
pub mod geometry;
pub mod nodes;
pub mod parser;
pub mod pipeline;
pub mod runtime;
pub mod story;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use artifacts::{ArtifactSet, FrameModel};
pub use config::BuildConfig;
pub use elements::RigidEndStrategy;
pub use errors::{ModelError, ModelResult};
pub use file_io::{load_artifacts, load_source, save_artifacts};
pub use pipeline::ModelBuilder;
pub use runtime::{submit, CommandRuntime, SolverRuntime};
pub use validation::ValidationReport;

/// Parse model text and build its artifact set.
///
/// Fatal errors (malformed records, undefined references) are returned;
/// per-member problems end up in [`ArtifactSet::skips`].
pub fn translate(text: &str, config: BuildConfig) -> ModelResult<ArtifactSet> {
    let parsed = parser::parse_model(text)?;
    let graph = story::build_story_graph(&parsed)?;
    ModelBuilder::new(config).build(&graph)
}
