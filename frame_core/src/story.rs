//! # Story Graph
//!
//! Orders stories top to bottom, fixes their elevations and merges the
//! global point/line tables with the per-story assignment tables into the
//! active point and line sets of each story.
//!
//! ## Elevations
//!
//! The base story is the first story whose `ELEV` is zero, otherwise the
//! lowest story. Elevations are then walked outward from the base:
//!
//! ```text
//! above the base:  z(s) = z(story below) + height(s)
//! below the base:  z(s) = z(story above) - height(story above)
//! ```
//!
//! An explicit `ELEV` always wins. A missing height leaves the elevation
//! unknown, and everything that depends on it stays unknown.
//!
//! ## Example
//!
//! ```rust
//! use frame_core::parser::parse_model;
//! use frame_core::story::build_story_graph;
//!
//! let parsed = parse_model(r#"
//! $ STORIES
//!   STORY "L2" HEIGHT 3.0
//!   STORY "L1" HEIGHT 4.0
//!   STORY "Base" ELEV 0
//! "#).unwrap();
//!
//! let graph = build_story_graph(&parsed).unwrap();
//! assert_eq!(graph.stories[0].elevation, Some(7.0));
//! assert_eq!(graph.story_index("Base"), Some(2));
//! ```

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constraints::DofMask;
use crate::errors::{ModelError, ModelResult};
use crate::geometry::{EndOffsetInput, Vec3};
use crate::parser::{LineKind, ParsedModel, PointRecord, SpringPropertyRecord, StoryRecord};

const ELEVATION_EPS: f64 = 1e-9;

// ============================================================================
// Types
// ============================================================================

/// A story with its resolved elevation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub name: String,
    /// Position from the top, 0 = topmost
    pub index: usize,
    /// `None` when no explicit or derivable elevation exists
    pub elevation: Option<f64>,
    pub height: Option<f64>,
    pub similar_to: Option<String>,
    pub master_story: bool,
}

/// A point placed on a story by an assignment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePoint {
    pub id: String,
    pub story_index: usize,
    /// Assigned coordinate; `None` when the story elevation is unknown
    pub coordinate: Option<Vec3>,
    pub diaphragm: Option<String>,
    pub spring: Option<String>,
    pub restraint: Option<DofMask>,
    pub mass: Option<f64>,
}

/// A member line placed on a story by an assignment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLine {
    pub name: String,
    /// Position in the connectivity table
    pub ordinal: usize,
    pub kind: LineKind,
    pub point_i: String,
    pub point_j: String,
    pub span: u32,
    pub story_index: usize,
    pub section: Option<String>,
    pub offsets: EndOffsetInput,
}

/// Stories plus their active point and line sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    /// Top to bottom
    pub stories: Vec<Story>,

    /// Global coordinate table in declaration order
    pub points: IndexMap<String, PointRecord>,

    /// Active points per story, indexed by story index
    pub active_points: Vec<IndexMap<String, ActivePoint>>,

    /// Active lines per story in connectivity order, indexed by story index
    pub active_lines: Vec<Vec<ActiveLine>>,

    /// Spring property sets
    pub springs: IndexMap<String, SpringPropertyRecord>,
}

impl StoryGraph {
    pub fn story_index(&self, name: &str) -> Option<usize> {
        self.stories.iter().position(|s| s.name == name)
    }

    pub fn story(&self, index: usize) -> Option<&Story> {
        self.stories.get(index)
    }

    /// Elevation of a story, `None` when unknown or out of range
    pub fn elevation(&self, index: usize) -> Option<f64> {
        self.stories.get(index).and_then(|s| s.elevation)
    }

    /// Assignment of a point on a story, if any
    pub fn assignment(&self, point: &str, story_index: usize) -> Option<&ActivePoint> {
        self.active_points.get(story_index).and_then(|m| m.get(point))
    }

    /// Position of a point in the coordinate table
    pub fn point_ordinal(&self, point: &str) -> Option<usize> {
        self.points.get_index_of(point)
    }
}

// ============================================================================
// Elevations
// ============================================================================

/// Resolve elevations for stories listed top to bottom.
///
/// ```rust
/// use frame_core::parser::StoryRecord;
/// use frame_core::story::compute_story_elevations;
///
/// let story = |name: &str, height: Option<f64>, elevation: Option<f64>| StoryRecord {
///     name: name.into(), height, elevation, similar_to: None, master_story: false, line: 0,
/// };
/// let records = [story("S2", Some(3.0), None), story("S1", None, None), story("Base", None, Some(0.0))];
/// assert_eq!(compute_story_elevations(&records), vec![None, None, Some(0.0)]);
/// ```
pub fn compute_story_elevations(records: &[StoryRecord]) -> Vec<Option<f64>> {
    let n = records.len();
    let mut z: Vec<Option<f64>> = vec![None; n];
    if n == 0 {
        return z;
    }

    let base = records
        .iter()
        .position(|s| s.elevation.is_some_and(|e| e.abs() <= ELEVATION_EPS))
        .unwrap_or(n - 1);
    z[base] = Some(records[base].elevation.unwrap_or(0.0));

    for k in (0..base).rev() {
        z[k] = records[k]
            .elevation
            .or_else(|| Some(z[k + 1]? + records[k].height?));
    }
    for k in base + 1..n {
        z[k] = records[k]
            .elevation
            .or_else(|| Some(z[k - 1]? - records[k - 1].height?));
    }
    z
}

// ============================================================================
// Builder
// ============================================================================

/// Build the story graph from parsed tables.
///
/// Fails with [`ModelError::UndefinedReference`] when an assignment names a
/// story, point, line, spring property or diaphragm that does not exist.
pub fn build_story_graph(parsed: &ParsedModel) -> ModelResult<StoryGraph> {
    let elevations = compute_story_elevations(&parsed.stories);
    let stories: Vec<Story> = parsed
        .stories
        .iter()
        .zip(elevations)
        .enumerate()
        .map(|(index, (record, elevation))| Story {
            name: record.name.clone(),
            index,
            elevation,
            height: record.height,
            similar_to: record.similar_to.clone(),
            master_story: record.master_story,
        })
        .collect();

    for story in stories.iter().filter(|s| s.elevation.is_none()) {
        debug!(story = story.name.as_str(); "Story elevation unknown");
    }

    let lookup: IndexMap<&str, usize> = stories.iter().map(|s| (s.name.as_str(), s.index)).collect();
    let story_of = |name: &str, context: String| {
        lookup
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::undefined("story", name, context))
    };

    let mut active_points: Vec<IndexMap<String, ActivePoint>> = vec![IndexMap::new(); stories.len()];
    for assign in parsed.point_assigns.values() {
        let context = format!("POINTASSIGN \"{}\" \"{}\" (line {})", assign.point, assign.story, assign.line);
        let story_index = story_of(&assign.story, context.clone())?;
        let point = parsed
            .points
            .get(&assign.point)
            .ok_or_else(|| ModelError::undefined("point", &assign.point, context.clone()))?;
        if let Some(spring) = &assign.spring {
            if !parsed.springs.contains_key(spring) {
                return Err(ModelError::undefined("spring property", spring, context));
            }
        }
        if let (Some(declared), Some(diaphragm)) = (&parsed.diaphragms, &assign.diaphragm) {
            if !declared.contains_key(diaphragm) {
                return Err(ModelError::undefined("diaphragm", diaphragm, context));
            }
        }

        let coordinate = stories[story_index]
            .elevation
            .map(|z| Vec3::new(point.x, point.y, z - point.third.unwrap_or(0.0)));

        active_points[story_index].insert(
            assign.point.clone(),
            ActivePoint {
                id: assign.point.clone(),
                story_index,
                coordinate,
                diaphragm: assign.diaphragm.clone(),
                spring: assign.spring.clone(),
                restraint: assign.restraint,
                mass: assign.mass,
            },
        );
    }

    let mut active_lines: Vec<Vec<ActiveLine>> = vec![Vec::new(); stories.len()];
    for assign in parsed.line_assigns.values() {
        let context = format!("LINEASSIGN \"{}\" \"{}\" (line {})", assign.line_name, assign.story, assign.line);
        let story_index = story_of(&assign.story, context.clone())?;
        let (ordinal, _, line) = parsed
            .lines
            .get_full(&assign.line_name)
            .ok_or_else(|| ModelError::undefined("line", &assign.line_name, context))?;

        active_lines[story_index].push(ActiveLine {
            name: line.name.clone(),
            ordinal,
            kind: line.kind,
            point_i: line.point_i.clone(),
            point_j: line.point_j.clone(),
            span: line.span(),
            story_index,
            section: assign.section.clone(),
            offsets: assign.end_offsets(),
        });
    }
    for lines in &mut active_lines {
        lines.sort_by_key(|l| l.ordinal);
    }

    info!(
        stories = stories.len(),
        placed_points = active_points.iter().map(IndexMap::len).sum::<usize>(),
        placed_lines = active_lines.iter().map(Vec::len).sum::<usize>();
        "Built story graph"
    );

    Ok(StoryGraph {
        stories,
        points: parsed.points.clone(),
        active_points,
        active_lines,
        springs: parsed.springs.clone(),
    })
}
