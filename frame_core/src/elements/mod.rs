//! # Frame Elements
//!
//! Element records and the rigid-end strategy that decides how a member with
//! end offsets becomes elements.
//!
//! - [`RigidEndStrategy::JointOffset`]: one element between the nominal end
//!   nodes; the offset vectors ride on its geometric transform.
//! - [`RigidEndStrategy::SplitSegments`]: up to three elements (rigid-I,
//!   deformable, rigid-J) joined at intermediate nodes. An end without an
//!   offset gets no rigid segment.
//!
//! Both strategies take their offsets from [`crate::geometry::joint_offsets`].

pub mod materialize;
pub mod sections;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geometry::Vec3;
use crate::parser::LineKind;

pub use materialize::{place_member, ElementContext, MemberEnds};
pub use sections::{RectangularSection, SectionProperties};

// ============================================================================
// STRATEGY
// ============================================================================

/// How rigid end zones are represented. Chosen once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigidEndStrategy {
    #[default]
    JointOffset,
    SplitSegments,
}

impl RigidEndStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RigidEndStrategy::JointOffset => "joint_offset",
            RigidEndStrategy::SplitSegments => "split_segments",
        }
    }
}

impl fmt::Display for RigidEndStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RigidEndStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "joint_offset" | "offset" => Ok(RigidEndStrategy::JointOffset),
            "split_segments" | "split" => Ok(RigidEndStrategy::SplitSegments),
            other => Err(format!("unknown rigid-end strategy '{other}' (expected joint_offset or split_segments)")),
        }
    }
}

// ============================================================================
// ELEMENTS
// ============================================================================

/// Which part of a member an element represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Whole,
    RigidI,
    Deformable,
    RigidJ,
}

impl SegmentRole {
    /// Slot in the element tag
    pub fn slot(self) -> u64 {
        match self {
            SegmentRole::Whole => 0,
            SegmentRole::RigidI => 1,
            SegmentRole::Deformable => 2,
            SegmentRole::RigidJ => 3,
        }
    }

    pub fn is_rigid(self) -> bool {
        matches!(self, SegmentRole::RigidI | SegmentRole::RigidJ)
    }
}

/// Geometric transform of an element. Its tag equals the element tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeomTransform {
    pub tag: u64,
    /// Vector in the local x-z plane
    pub vecxz: Vec3,
    /// Joint offset at the I end
    pub offset_i: Vec3,
    /// Joint offset at the J end
    pub offset_j: Vec3,
}

/// A 3D elastic frame element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameElement {
    pub tag: u64,
    pub node_i: u64,
    pub node_j: u64,
    /// Source line name
    pub line: String,
    pub kind: LineKind,
    /// Assigned story
    pub story: String,
    pub story_index: usize,
    pub role: SegmentRole,
    pub section: Option<String>,
    pub properties: SectionProperties,
    pub transform: GeomTransform,
    /// Distance between the element's nodes
    pub length: f64,
}
