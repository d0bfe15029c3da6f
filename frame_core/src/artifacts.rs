//! # Artifact Set
//!
//! The finished output of one translation: the frame model itself, what was
//! skipped or overridden along the way, and the validation report.
//!
//! ```text
//! ArtifactSet
//! ├── schema_version, strategy
//! ├── stories, nodes, elements, diaphragms, springs, supports   (FrameModel)
//! ├── skips       (unresolved references, degenerate members)
//! ├── conflicts   (constraints dropped by precedence)
//! └── validation  (per-check outcomes and findings)
//! ```
//!
//! The schema only grows: new fields are added with serde defaults, existing
//! ones keep their meaning. Nothing time- or randomness-dependent is stored,
//! so unchanged input always serializes to identical bytes.

use serde::{Deserialize, Serialize};

use crate::constraints::{Diaphragm, SpringTable, Support};
use crate::elements::{FrameElement, RigidEndStrategy};
use crate::errors::ModelError;
use crate::nodes::Node;
use crate::story::Story;
use crate::validation::ValidationReport;

/// Current artifact schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Nodes, elements and constraints of the finite-element graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameModel {
    /// Stories, top to bottom
    pub stories: Vec<Story>,

    /// Nodes in registration order
    pub nodes: Vec<Node>,

    /// Frame elements in emission order
    pub elements: Vec<FrameElement>,

    #[serde(default)]
    pub diaphragms: Vec<Diaphragm>,

    #[serde(default)]
    pub springs: SpringTable,

    #[serde(default)]
    pub supports: Vec<Support>,
}

impl FrameModel {
    /// Total number of restrained DOFs over all supports
    pub fn restrained_dofs(&self) -> usize {
        self.supports.iter().map(|s| s.mask.fixed_count()).sum()
    }
}

/// Complete, read-only result of a translation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub schema_version: String,

    /// Rigid-end strategy the elements were built with
    pub strategy: RigidEndStrategy,

    #[serde(flatten)]
    pub model: FrameModel,

    /// Items skipped without aborting the build
    #[serde(default)]
    pub skips: Vec<ModelError>,

    /// Constraints dropped by precedence
    #[serde(default)]
    pub conflicts: Vec<ModelError>,

    pub validation: ValidationReport,
}

impl ArtifactSet {
    /// Whether critical findings forbid handing the model to a solver
    pub fn blocks_execution(&self) -> bool {
        self.validation.blocks_execution()
    }

    /// Pretty JSON, the on-disk form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
