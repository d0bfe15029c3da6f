//! Node resolution: (point id, story) to a registered grid node.
//!
//! Coordinates come from, in priority order:
//!
//! 1. the point's assignment on that story (authoritative);
//! 2. the point's global coordinate at the story elevation, for points that
//!    exist geometrically but were never assigned to the story.
//!
//! When neither applies the pair is unresolved. That is reported as a
//! non-fatal [`ModelError::UnresolvedReference`] so the caller can skip the
//! dependent element and move on.

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};
use crate::geometry::Vec3;
use crate::story::StoryGraph;

use super::{Node, NodeKind, NodeRegistry, TagScheme};

/// Which priority produced a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Assigned,
    Fallback,
}

/// A resolved and registered grid node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNode {
    pub tag: u64,
    pub coordinate: Vec3,
    pub resolution: Resolution,
}

/// Resolves grid nodes against one story graph.
#[derive(Debug, Clone, Copy)]
pub struct NodeResolver<'a> {
    graph: &'a StoryGraph,
    scheme: TagScheme,
}

impl<'a> NodeResolver<'a> {
    pub fn new(graph: &'a StoryGraph, scheme: TagScheme) -> Self {
        NodeResolver { graph, scheme }
    }

    pub fn scheme(&self) -> TagScheme {
        self.scheme
    }

    pub fn graph(&self) -> &'a StoryGraph {
        self.graph
    }

    /// Grid tag of a point on a story, `None` when the point is not in the coordinate table
    pub fn tag_of(&self, point: &str, story_index: usize) -> Option<u64> {
        let ordinal = self.graph.point_ordinal(point)?;
        Some(self.scheme.grid(TagScheme::point_number(point, ordinal), story_index))
    }

    /// Coordinate of a point on a story without registering anything.
    ///
    /// `subject` names the record that needs the point and ends up in the
    /// error message.
    pub fn coordinate(&self, point: &str, story_index: usize, subject: &str) -> ModelResult<(Vec3, Resolution)> {
        let story = self.graph.story(story_index).ok_or_else(|| {
            ModelError::unresolved(subject, point, format!("#{story_index}"), "story index out of range")
        })?;

        if let Some(assigned) = self.graph.assignment(point, story_index) {
            return assigned
                .coordinate
                .map(|c| (c, Resolution::Assigned))
                .ok_or_else(|| ModelError::unresolved(subject, point, &story.name, "story elevation unknown"));
        }

        let global = self
            .graph
            .points
            .get(point)
            .ok_or_else(|| ModelError::unresolved(subject, point, &story.name, "point not in coordinate table"))?;
        let z = story
            .elevation
            .ok_or_else(|| ModelError::unresolved(subject, point, &story.name, "story elevation unknown"))?;

        Ok((
            Vec3::new(global.x, global.y, z - global.third.unwrap_or(0.0)),
            Resolution::Fallback,
        ))
    }

    /// Resolve a point on a story and register its grid node.
    ///
    /// Idempotent: the same pair always yields the same tag and coordinate and
    /// is registered once.
    pub fn resolve(
        &self,
        registry: &mut NodeRegistry,
        point: &str,
        story_index: usize,
        subject: &str,
    ) -> ModelResult<ResolvedNode> {
        let (coordinate, resolution) = self.coordinate(point, story_index, subject)?;
        let story = &self.graph.stories[story_index];
        let tag = self.tag_of(point, story_index).ok_or_else(|| {
            ModelError::unresolved(subject, point, &story.name, "point not in coordinate table")
        })?;

        if resolution == Resolution::Fallback && !registry.contains(tag) {
            info!(point, story = story.name.as_str(), subject; "Placed point through fallback coordinate");
        }

        let node = Node::new(tag, coordinate, &story.name, story_index, NodeKind::Grid).with_point(point);
        registry.register(node)?;

        Ok(ResolvedNode {
            tag,
            coordinate,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_model;
    use crate::story::build_story_graph;

    const MODEL: &str = r#"
$ STORIES
  STORY "S3" HEIGHT 3.0
  STORY "S2"
  STORY "S1" HEIGHT 4.0 ELEV 12.0
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "60" 7.5 -2.0
  POINT "C7" 1 1 0.3
$ POINT ASSIGNS
  POINTASSIGN "1" "S1"
  POINTASSIGN "1" "S3"
"#;

    fn graph() -> StoryGraph {
        build_story_graph(&parse_model(MODEL).unwrap()).unwrap()
    }

    #[test]
    fn test_fallback_placement() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let mut registry = NodeRegistry::new();

        let s1 = graph.story_index("S1").unwrap();
        let node = resolver.resolve(&mut registry, "60", s1, "line 'B7'").unwrap();
        assert_eq!(node.coordinate, Vec3::new(7.5, -2.0, 12.0));
        assert_eq!(node.resolution, Resolution::Fallback);
        assert_eq!(node.tag, 60_002);
        assert_eq!(registry.get(node.tag).unwrap().point.as_deref(), Some("60"));
    }

    #[test]
    fn test_assignment_preferred() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let (coordinate, resolution) = resolver.coordinate("1", 2, "test").unwrap();
        assert_eq!(resolution, Resolution::Assigned);
        assert_eq!(coordinate, Vec3::new(0.0, 0.0, 12.0));
    }

    #[test]
    fn test_idempotent() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let mut registry = NodeRegistry::new();

        let first = resolver.resolve(&mut registry, "C7", 3, "test").unwrap();
        let second = resolver.resolve(&mut registry, "C7", 3, "test").unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(first.coordinate, Vec3::new(1.0, 1.0, -0.3));
    }

    #[test]
    fn test_unknown_elevation_is_a_clean_skip() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let mut registry = NodeRegistry::new();

        // S2 has no height, so S2 and S3 above it have no elevation
        for (point, story) in [("60", 1), ("1", 0)] {
            let err = resolver.resolve(&mut registry, point, story, "line 'B1'").unwrap_err();
            assert!(!err.is_fatal());
            assert!(err.to_string().contains("elevation unknown"));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_point_is_a_clean_skip() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let err = resolver.coordinate("999", 2, "line 'B9'").unwrap_err();
        assert_eq!(err.error_code(), "UNRESOLVED_REFERENCE");
    }
}
