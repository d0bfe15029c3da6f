//! Member placement and element materialization.
//!
//! Placement decides which two grid nodes a member spans. Materialization
//! turns the member into one element, or into rigid and deformable segments,
//! registering any intermediate node before the element that uses it.

use log::debug;

use crate::config::BuildConfig;
use crate::errors::{ModelError, ModelResult};
use crate::geometry::{joint_offsets, transform_reference, EndOffsets, Vec3};
use crate::nodes::{End, Node, NodeKind, NodeRegistry, NodeResolver, ResolvedNode, TagScheme};
use crate::parser::LineKind;
use crate::story::{ActiveLine, StoryGraph};

use super::sections::{resolve_section, SectionProperties};
use super::{FrameElement, GeomTransform, RigidEndStrategy, SegmentRole};

/// The two registered grid nodes a member spans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberEnds {
    pub i: ResolvedNode,
    pub j: ResolvedNode,
    pub i_story: usize,
    pub j_story: usize,
    /// Ends swapped relative to the line definition
    pub flipped: bool,
}

pub(crate) fn subject(line: &ActiveLine) -> String {
    format!("line '{}'", line.name)
}

/// Story holding the I end of a member that spans `span` stories down from `story_index`.
///
/// The first story at or below `story_index + span` where the point is
/// explicitly assigned wins; otherwise the story exactly `span` below.
fn lower_story(graph: &StoryGraph, point: &str, story_index: usize, span: u32) -> Option<usize> {
    let start = story_index + span as usize;
    if start >= graph.stories.len() {
        return None;
    }
    (start..graph.stories.len())
        .find(|&k| graph.assignment(point, k).is_some())
        .or(Some(start))
}

/// Lowest assigned placement of a point on `story_index` or any story below it
fn lowest_assignment(graph: &StoryGraph, point: &str, story_index: usize) -> Option<(usize, Vec3)> {
    (story_index..graph.stories.len())
        .filter_map(|k| graph.assignment(point, k)?.coordinate.map(|c| (k, c)))
        .min_by(|a, b| a.1.z.total_cmp(&b.1.z))
}

/// A column between two different points. Each end goes to the lowest story,
/// at or below the assigned one, that assigns its point; the lower end becomes I.
fn place_two_point_column(
    resolver: &NodeResolver<'_>,
    registry: &mut NodeRegistry,
    line: &ActiveLine,
) -> ModelResult<MemberEnds> {
    let graph = resolver.graph();
    let subject = subject(line);
    let locate = |point: &str| {
        lowest_assignment(graph, point, line.story_index)
            .map(|(k, _)| k)
            .ok_or_else(|| {
                ModelError::unresolved(
                    &subject,
                    point,
                    &graph.stories[line.story_index].name,
                    "point not assigned on this story or any story below",
                )
            })
    };
    let story_i = locate(&line.point_i)?;
    let story_j = locate(&line.point_j)?;

    let i = resolver.resolve(registry, &line.point_i, story_i, &subject)?;
    let j = resolver.resolve(registry, &line.point_j, story_j, &subject)?;
    if j.coordinate.z < i.coordinate.z {
        debug!(line = line.name.as_str(); "Column defined top to bottom, ends swapped");
        return Ok(MemberEnds {
            i: j,
            j: i,
            i_story: story_j,
            j_story: story_i,
            flipped: true,
        });
    }
    Ok(MemberEnds {
        i,
        j,
        i_story: story_i,
        j_story: story_j,
        flipped: false,
    })
}

/// Resolve and register the end nodes of a member.
///
/// Beams and other lines with span 0 sit on their assigned story. Lines with a
/// span (columns by default) put J on the assigned story and I below it, so
/// columns always run bottom to top. Columns between two different points
/// place each point on its own lowest assigned story instead.
pub fn place_member(resolver: &NodeResolver<'_>, registry: &mut NodeRegistry, line: &ActiveLine) -> ModelResult<MemberEnds> {
    if line.kind == LineKind::Column && line.point_i != line.point_j {
        return place_two_point_column(resolver, registry, line);
    }

    let graph = resolver.graph();
    let subject = subject(line);
    let j_story = line.story_index;
    let i_story = if line.span == 0 {
        j_story
    } else {
        lower_story(graph, &line.point_i, j_story, line.span).ok_or_else(|| {
            ModelError::unresolved(
                &subject,
                &line.point_i,
                &graph.stories[j_story].name,
                format!("no story {} below for the I end", line.span),
            )
        })?
    };

    // Both ends must resolve before either node is registered
    resolver.coordinate(&line.point_i, i_story, &subject)?;
    resolver.coordinate(&line.point_j, j_story, &subject)?;

    let i = resolver.resolve(registry, &line.point_i, i_story, &subject)?;
    let j = resolver.resolve(registry, &line.point_j, j_story, &subject)?;
    Ok(MemberEnds {
        i,
        j,
        i_story,
        j_story,
        flipped: false,
    })
}

/// Everything needed to turn placed members into elements
#[derive(Debug, Clone, Copy)]
pub struct ElementContext<'a> {
    pub scheme: TagScheme,
    pub config: &'a BuildConfig,
    pub graph: &'a StoryGraph,
}

impl ElementContext<'_> {
    /// Materialize one placed member under the configured strategy.
    ///
    /// Degenerate members return a non-fatal [`ModelError::DegenerateGeometry`]
    /// before anything is registered.
    pub fn materialize(
        &self,
        registry: &mut NodeRegistry,
        line: &ActiveLine,
        ends: &MemberEnds,
    ) -> ModelResult<Vec<FrameElement>> {
        let tolerance = self.config.tolerances.degenerate_length;
        let p_i = ends.i.coordinate;
        let p_j = ends.j.coordinate;
        let story = self.story_name(line.story_index);
        let length = p_i.distance(p_j);

        let input = if ends.flipped { line.offsets.swapped() } else { line.offsets };
        let offsets = joint_offsets(p_i, p_j, &input, tolerance).ok_or_else(|| {
            ModelError::degenerate(subject(line), story, length, "member length below tolerance")
        })?;
        let properties = resolve_section(line.section.as_deref(), line.kind, &self.config.sections);

        let has_i = offsets.i.norm() > tolerance;
        let has_j = offsets.j.norm() > tolerance;
        if self.config.strategy == RigidEndStrategy::JointOffset || !(has_i || has_j) {
            let element = self.element(
                registry,
                line,
                SegmentRole::Whole,
                (ends.i.tag, ends.j.tag),
                properties,
                offsets,
            )?;
            return Ok(vec![element]);
        }

        let m_i = p_i + offsets.i;
        let m_j = p_j + offsets.j;
        let clear = m_i.distance(m_j);
        if clear <= tolerance {
            return Err(ModelError::degenerate(
                subject(line),
                story,
                clear,
                "rigid ends leave no deformable length",
            ));
        }

        let inner_i = if has_i {
            self.intermediate(registry, line, End::I, m_i, ends.i_story)?
        } else {
            ends.i.tag
        };
        let inner_j = if has_j {
            self.intermediate(registry, line, End::J, m_j, ends.j_story)?
        } else {
            ends.j.tag
        };

        let rigid = properties.stiffened(self.config.rigid_end_scale);
        let no_offsets = EndOffsets::default();
        let mut elements = Vec::with_capacity(3);
        if has_i {
            elements.push(self.element(registry, line, SegmentRole::RigidI, (ends.i.tag, inner_i), rigid, no_offsets)?);
        }
        elements.push(self.element(
            registry,
            line,
            SegmentRole::Deformable,
            (inner_i, inner_j),
            properties,
            no_offsets,
        )?);
        if has_j {
            elements.push(self.element(registry, line, SegmentRole::RigidJ, (inner_j, ends.j.tag), rigid, no_offsets)?);
        }

        debug!(line = line.name.as_str(), story, segments = elements.len(); "Split member into segments");
        Ok(elements)
    }

    fn story_name(&self, index: usize) -> &str {
        self.graph.stories.get(index).map(|s| s.name.as_str()).unwrap_or("")
    }

    fn intermediate(
        &self,
        registry: &mut NodeRegistry,
        line: &ActiveLine,
        end: End,
        coordinate: Vec3,
        story_index: usize,
    ) -> ModelResult<u64> {
        let tag = self.scheme.intermediate(line.ordinal, line.story_index, end);
        let node = Node::new(tag, coordinate, self.story_name(story_index), story_index, NodeKind::Intermediate);
        registry.register(node)
    }

    /// Build one element after checking both nodes already exist
    fn element(
        &self,
        registry: &NodeRegistry,
        line: &ActiveLine,
        role: SegmentRole,
        (node_i, node_j): (u64, u64),
        properties: SectionProperties,
        offsets: EndOffsets,
    ) -> ModelResult<FrameElement> {
        let tag = self.scheme.frame_element(line.ordinal, line.story_index, role);
        let (Some(a), Some(b)) = (registry.get(node_i), registry.get(node_j)) else {
            let missing = if registry.contains(node_i) { node_j } else { node_i };
            return Err(ModelError::OrderingViolation { element: tag, node: missing });
        };

        Ok(FrameElement {
            tag,
            node_i,
            node_j,
            line: line.name.clone(),
            kind: line.kind,
            story: self.story_name(line.story_index).to_string(),
            story_index: line.story_index,
            role,
            section: line.section.clone(),
            properties,
            transform: GeomTransform {
                tag,
                vecxz: transform_reference(a.coordinate, b.coordinate, self.config.tolerances.degenerate_length),
                offset_i: offsets.i,
                offset_j: offsets.j,
            },
            length: a.coordinate.distance(b.coordinate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EndOffsetInput;
    use crate::parser::parse_model;
    use crate::story::build_story_graph;
    use float_cmp::assert_approx_eq;

    const MODEL: &str = r#"
$ STORIES
  STORY "L2" HEIGHT 3.0
  STORY "L1" HEIGHT 3.0
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 10 0
$ POINT ASSIGNS
  POINTASSIGN "1" "L2"
  POINTASSIGN "1" "Base"
"#;

    fn graph() -> StoryGraph {
        build_story_graph(&parse_model(MODEL).unwrap()).unwrap()
    }

    fn beam(offsets: EndOffsetInput) -> ActiveLine {
        ActiveLine {
            name: "B1".into(),
            ordinal: 0,
            kind: LineKind::Beam,
            point_i: "1".into(),
            point_j: "2".into(),
            span: 0,
            story_index: 2,
            section: None,
            offsets,
        }
    }

    fn build(strategy: RigidEndStrategy, line: &ActiveLine) -> (NodeRegistry, ModelResult<Vec<FrameElement>>) {
        let graph = graph();
        let config = BuildConfig { strategy, ..Default::default() };
        let scheme = TagScheme::new(graph.stories.len());
        let resolver = NodeResolver::new(&graph, scheme);
        let mut registry = NodeRegistry::new();
        let ends = place_member(&resolver, &mut registry, line).unwrap();
        let ctx = ElementContext { scheme, config: &config, graph: &graph };
        let result = ctx.materialize(&mut registry, line, &ends);
        (registry, result)
    }

    #[test]
    fn test_joint_offset_single_element() {
        let line = beam(EndOffsetInput { length_i: 0.4, ..Default::default() });
        let (_, result) = build(RigidEndStrategy::JointOffset, &line);
        let elements = result.unwrap();

        assert_eq!(elements.len(), 1);
        let e = &elements[0];
        assert_eq!(e.role, SegmentRole::Whole);
        assert_approx_eq!(f64, e.transform.offset_i.x, 0.4);
        assert!(e.transform.offset_j.is_zero(1e-12));
        assert_approx_eq!(f64, e.length, 10.0);
        assert_eq!(e.transform.vecxz, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_split_with_one_offset() {
        let line = beam(EndOffsetInput { length_i: 0.4, ..Default::default() });
        let (registry, result) = build(RigidEndStrategy::SplitSegments, &line);
        let elements = result.unwrap();

        let roles: Vec<SegmentRole> = elements.iter().map(|e| e.role).collect();
        assert_eq!(roles, [SegmentRole::RigidI, SegmentRole::Deformable]);
        let total: f64 = elements.iter().map(|e| e.length).sum();
        assert_approx_eq!(f64, total, 10.0, epsilon = 1e-9);

        let inner = registry.get(elements[0].node_j).unwrap();
        assert_eq!(inner.kind, NodeKind::Intermediate);
        assert_approx_eq!(f64, inner.coordinate.x, 0.4);
        assert_approx_eq!(f64, elements[0].properties.area, elements[1].properties.area * 1.0e6);
    }

    #[test]
    fn test_split_with_both_offsets() {
        let line = beam(EndOffsetInput { length_i: 0.4, length_j: 0.3, ..Default::default() });
        let (_, result) = build(RigidEndStrategy::SplitSegments, &line);
        let elements = result.unwrap();

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2].role, SegmentRole::RigidJ);
        assert_eq!(elements[0].node_j, elements[1].node_i);
        assert_eq!(elements[1].node_j, elements[2].node_i);
        let total: f64 = elements.iter().map(|e| e.length).sum();
        assert_approx_eq!(f64, total, 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, elements[1].length, 9.3, epsilon = 1e-9);
    }

    #[test]
    fn test_offsets_consuming_member_are_degenerate() {
        let line = beam(EndOffsetInput { length_i: 6.0, length_j: 4.0, ..Default::default() });
        let (registry, result) = build(RigidEndStrategy::SplitSegments, &line);
        let err = result.unwrap_err();
        assert_eq!(err.error_code(), "DEGENERATE_GEOMETRY");
        assert!(!err.is_fatal());
        assert!(registry.iter().all(|n| n.kind == NodeKind::Grid));
    }

    #[test]
    fn test_column_spans_down_to_assigned_story() {
        let graph = graph();
        let scheme = TagScheme::new(graph.stories.len());
        let resolver = NodeResolver::new(&graph, scheme);
        let mut registry = NodeRegistry::new();

        // Point 1 is assigned on L2 and Base but not L1: the I end skips to Base
        let column = ActiveLine {
            name: "C1".into(),
            ordinal: 1,
            kind: LineKind::Column,
            point_i: "1".into(),
            point_j: "1".into(),
            span: 1,
            story_index: 0,
            section: None,
            offsets: EndOffsetInput::default(),
        };
        let ends = place_member(&resolver, &mut registry, &column).unwrap();
        assert_eq!(ends.i_story, 2);
        assert_eq!(ends.j_story, 0);
        assert!(ends.i.coordinate.z < ends.j.coordinate.z);

        let config = BuildConfig::default();
        let ctx = ElementContext { scheme, config: &config, graph: &graph };
        let elements = ctx.materialize(&mut registry, &column, &ends).unwrap();
        assert_eq!(elements[0].transform.vecxz, Vec3::new(1.0, 0.0, 0.0));
        assert_approx_eq!(f64, elements[0].length, 6.0);
    }

    #[test]
    fn test_column_without_lower_story() {
        let graph = graph();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let mut registry = NodeRegistry::new();
        let column = ActiveLine {
            name: "C9".into(),
            ordinal: 0,
            kind: LineKind::Column,
            point_i: "2".into(),
            point_j: "2".into(),
            span: 1,
            story_index: 2,
            section: None,
            offsets: EndOffsetInput::default(),
        };
        let err = place_member(&resolver, &mut registry, &column).unwrap_err();
        assert_eq!(err.error_code(), "UNRESOLVED_REFERENCE");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ordering_violation_detected() {
        let graph = graph();
        let config = BuildConfig::default();
        let scheme = TagScheme::new(graph.stories.len());
        let ctx = ElementContext { scheme, config: &config, graph: &graph };
        let registry = NodeRegistry::new();
        let err = ctx
            .element(
                &registry,
                &beam(EndOffsetInput::default()),
                SegmentRole::Whole,
                (1002, 2002),
                config.sections.beam.properties(),
                EndOffsets::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::OrderingViolation { node: 1002, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_column_defined_top_down_is_flipped() {
        let text = r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 1 0
$ POINT ASSIGNS
  POINTASSIGN "1" "L1"
  POINTASSIGN "2" "L1"
  POINTASSIGN "2" "Base"
"#;
        let graph = build_story_graph(&parse_model(text).unwrap()).unwrap();
        let scheme = TagScheme::new(graph.stories.len());
        let resolver = NodeResolver::new(&graph, scheme);
        let mut registry = NodeRegistry::new();

        // Point 1 is only on L1, point 2 reaches down to Base; the rigid
        // length belongs to the point 1 end
        let column = ActiveLine {
            name: "C5".into(),
            ordinal: 0,
            kind: LineKind::Column,
            point_i: "1".into(),
            point_j: "2".into(),
            span: 1,
            story_index: 0,
            section: None,
            offsets: EndOffsetInput { length_i: 0.5, ..Default::default() },
        };
        let ends = place_member(&resolver, &mut registry, &column).unwrap();
        assert!(ends.flipped);
        assert_eq!((ends.i.tag, ends.i_story), (2001, 1));
        assert_eq!((ends.j.tag, ends.j_story), (1000, 0));

        let config = BuildConfig::default();
        let ctx = ElementContext { scheme, config: &config, graph: &graph };
        let elements = ctx.materialize(&mut registry, &column, &ends).unwrap();
        assert_eq!(elements.len(), 1);
        let e = &elements[0];
        assert_eq!((e.node_i, e.node_j), (2001, 1000));
        assert_eq!(e.transform.offset_i, Vec3::ZERO);
        // Pulled down the axis from the top end, toward point 2
        let root10 = 10f64.sqrt();
        assert_approx_eq!(f64, e.transform.offset_j.x, 0.5 / root10, epsilon = 1e-12);
        assert_approx_eq!(f64, e.transform.offset_j.z, -1.5 / root10, epsilon = 1e-12);
        assert_approx_eq!(f64, e.length, root10, epsilon = 1e-12);
    }

    #[test]
    fn test_two_point_column_bottom_up_keeps_ends() {
        let text = r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 1 0
$ POINT ASSIGNS
  POINTASSIGN "1" "Base"
  POINTASSIGN "2" "L1"
"#;
        let graph = build_story_graph(&parse_model(text).unwrap()).unwrap();
        let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
        let mut registry = NodeRegistry::new();
        let column = ActiveLine {
            name: "C6".into(),
            ordinal: 0,
            kind: LineKind::Column,
            point_i: "1".into(),
            point_j: "2".into(),
            span: 1,
            story_index: 0,
            section: None,
            offsets: EndOffsetInput::default(),
        };
        let ends = place_member(&resolver, &mut registry, &column).unwrap();
        assert!(!ends.flipped);
        assert_eq!((ends.i.tag, ends.j.tag), (1001, 2000));

        let missing = ActiveLine { point_j: "3".into(), ..column };
        let err = place_member(&resolver, &mut registry, &missing).unwrap_err();
        assert_eq!(err.error_code(), "UNRESOLVED_REFERENCE");
    }
}
