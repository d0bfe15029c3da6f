//! Rigid floor diaphragms.
//!
//! One diaphragm per story carrying a rigid-floor tag. Slaves are:
//!
//! - grid nodes of the story whose assignment names a diaphragm, and
//! - intermediate nodes of the story,
//!
//! in both cases only when they sit on the story plane. Labels are all or
//! nothing: when any assigned point on the plane has no label (or is
//! `DISCONNECTED`), the story gets no diaphragm and the skip is recorded. The master is a new
//! node at the XY centroid of its slaves, at the story elevation.
//!
//! Mass is lumped on the master. A slave's tributary mass is its explicit
//! `MASS`; when no slave of the story has one, the slab mass
//! `density * thickness * hull area` is split evenly over the grid slaves.
//! The rotational inertia about the master is `sum(m_i * r_i^2)`.
//!
//! A story with a point restraint gets no diaphragm: the restraint takes
//! precedence. Both kinds of skip are recorded as a
//! [`ModelError::ConstraintConflict`].

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DiaphragmSettings, Tolerances};
use crate::errors::{ModelError, ModelResult};
use crate::geometry::{convex_hull_area, Vec3};
use crate::nodes::{Node, NodeKind, NodeRegistry, NodeResolver};

use super::{DofMask, Support, SupportSource};

/// Where a diaphragm's mass came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassSource {
    /// Explicit `MASS` values on the story's points
    Explicit,
    /// Slab proxy over the convex hull of the slaves
    Slab,
}

/// A slave node and its tributary mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiaphragmSlave {
    pub node: u64,
    pub mass: f64,
}

/// Rigid diaphragm of one story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diaphragm {
    pub story: String,
    pub story_index: usize,
    pub master: u64,
    pub slaves: Vec<DiaphragmSlave>,
    /// Diaphragm names seen on the slaves, first-seen order
    pub labels: Vec<String>,
    /// Translational mass on the master
    pub mass: f64,
    /// Mass moment of inertia about the vertical axis through the master
    pub rotational_inertia: f64,
    pub mass_source: MassSource,
    /// Plan area of the slave hull
    pub area: f64,
    /// DOFs fixed on the master
    pub fix_mask: DofMask,
}

/// Diaphragms plus the stories skipped because of supports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiaphragmOutput {
    pub diaphragms: Vec<Diaphragm>,
    pub conflicts: Vec<ModelError>,
}

struct Candidate {
    tag: u64,
    coordinate: Vec3,
    label: Option<String>,
    mass: Option<f64>,
    grid: bool,
}

/// Generate all diaphragms, registering their master nodes.
pub fn generate_diaphragms(
    resolver: &NodeResolver<'_>,
    registry: &mut NodeRegistry,
    supports: &[Support],
    settings: &DiaphragmSettings,
    tolerances: &Tolerances,
) -> ModelResult<DiaphragmOutput> {
    let graph = resolver.graph();
    let scheme = resolver.scheme();

    let mut by_story: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for node in registry.iter() {
        let Some(z) = graph.elevation(node.story_index) else {
            continue;
        };
        if (node.coordinate.z - z).abs() > tolerances.plane {
            continue;
        }
        let candidate = match node.kind {
            NodeKind::Grid => {
                let assignment = node
                    .point
                    .as_deref()
                    .and_then(|p| graph.assignment(p, node.story_index));
                // Fallback-placed points carry no assignment and no label
                let Some(assignment) = assignment else {
                    continue;
                };
                Candidate {
                    tag: node.tag,
                    coordinate: node.coordinate,
                    label: assignment.diaphragm.clone(),
                    mass: assignment.mass,
                    grid: true,
                }
            }
            NodeKind::Intermediate => Candidate {
                tag: node.tag,
                coordinate: node.coordinate,
                label: None,
                mass: None,
                grid: false,
            },
            NodeKind::DiaphragmMaster | NodeKind::Ground => continue,
        };
        by_story.entry(node.story_index).or_default().push(candidate);
    }

    let mut restrained_stories: BTreeMap<usize, u64> = BTreeMap::new();
    for support in supports.iter().filter(|s| s.source == SupportSource::PointRestraint) {
        if let Some(node) = registry.get(support.node) {
            restrained_stories.entry(node.story_index).or_insert(support.node);
        }
    }

    let mut output = DiaphragmOutput::default();
    for (story_index, candidates) in by_story {
        // No labelled point on the plane: the story carries no rigid-floor tag
        if !candidates.iter().any(|c| c.label.is_some()) {
            continue;
        }
        let story = &graph.stories[story_index];
        let z = story.elevation.unwrap_or_default();

        if let Some(node) = restrained_stories.get(&story_index) {
            warn!(story = story.name.as_str(), node = *node; "Story has point restraints, diaphragm skipped");
            output.conflicts.push(ModelError::conflict(
                &story.name,
                format!("point restraint on node {node} takes precedence over the rigid diaphragm"),
            ));
            continue;
        }
        let unlabelled: Vec<u64> = candidates
            .iter()
            .filter(|c| c.grid && c.label.is_none())
            .map(|c| c.tag)
            .collect();
        if !unlabelled.is_empty() {
            warn!(story = story.name.as_str(), unlabelled = unlabelled.len(); "Mixed diaphragm labels, diaphragm skipped");
            output.conflicts.push(ModelError::conflict(
                &story.name,
                format!("mixed or missing diaphragm labels, unlabelled nodes {unlabelled:?}"),
            ));
            continue;
        }
        if candidates.len() < 2 {
            info!(story = story.name.as_str(); "Fewer than two diaphragm nodes, no diaphragm");
            continue;
        }

        let count = candidates.len() as f64;
        let cx = candidates.iter().map(|c| c.coordinate.x).sum::<f64>() / count;
        let cy = candidates.iter().map(|c| c.coordinate.y).sum::<f64>() / count;
        let center = Vec3::new(cx, cy, z);

        let hull: Vec<(f64, f64)> = candidates.iter().map(|c| (c.coordinate.x, c.coordinate.y)).collect();
        let area = convex_hull_area(&hull);

        let explicit = candidates.iter().any(|c| c.mass.is_some());
        let grid_count = candidates.iter().filter(|c| c.grid).count() as f64;
        let slab_share = settings.density * settings.slab_thickness * area / grid_count;

        let slaves: Vec<DiaphragmSlave> = candidates
            .iter()
            .map(|c| DiaphragmSlave {
                node: c.tag,
                mass: match (explicit, c.grid) {
                    (true, _) => c.mass.unwrap_or(0.0),
                    (false, true) => slab_share,
                    (false, false) => 0.0,
                },
            })
            .collect();

        let mass: f64 = slaves.iter().map(|s| s.mass).sum();
        let rotational_inertia: f64 = slaves
            .iter()
            .zip(&candidates)
            .map(|(s, c)| s.mass * c.coordinate.planar_distance_sq(center))
            .sum();

        let mut labels: Vec<String> = Vec::new();
        for label in candidates.iter().filter_map(|c| c.label.as_ref()) {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        let master = registry.register(Node::new(
            scheme.master(story_index),
            center,
            &story.name,
            story_index,
            NodeKind::DiaphragmMaster,
        ))?;

        info!(
            story = story.name.as_str(),
            master,
            slaves = slaves.len(),
            mass;
            "Created rigid diaphragm"
        );
        output.diaphragms.push(Diaphragm {
            story: story.name.clone(),
            story_index,
            master,
            slaves,
            labels,
            mass,
            rotational_inertia,
            mass_source: if explicit { MassSource::Explicit } else { MassSource::Slab },
            area,
            fix_mask: settings.fix_mask,
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::generate_supports;
    use crate::nodes::TagScheme;
    use crate::parser::parse_model;
    use crate::story::{build_story_graph, StoryGraph};
    use float_cmp::assert_approx_eq;

    fn run(text: &str) -> (StoryGraph, ModelResult<(NodeRegistry, DiaphragmOutput)>) {
        let graph = build_story_graph(&parse_model(text).unwrap()).unwrap();
        let result = {
            let resolver = NodeResolver::new(&graph, TagScheme::new(graph.stories.len()));
            let mut registry = NodeRegistry::new();
            for (story_index, points) in graph.active_points.iter().enumerate() {
                for id in points.keys() {
                    resolver.resolve(&mut registry, id, story_index, "test").unwrap();
                }
            }
            let supports = generate_supports(&resolver, &registry);
            generate_diaphragms(
                &resolver,
                &mut registry,
                &supports,
                &DiaphragmSettings::default(),
                &Tolerances::default(),
            )
            .map(|out| (registry, out))
        };
        (graph, result)
    }

    #[test]
    fn test_explicit_masses_parallel_axis() {
        let (_, result) = run(
            r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 4 0
  POINT "3" 4 2
  POINT "4" 0 2
$ POINT ASSIGNS
  POINTASSIGN "1" "L1" DIAPH "D1" MASS 10
  POINTASSIGN "2" "L1" DIAPH "D1" MASS 20
  POINTASSIGN "3" "L1" DIAPH "D1" MASS 30
  POINTASSIGN "4" "L1" DIAPH "D1" MASS 40
"#,
        );
        let (registry, out) = result.unwrap();
        assert_eq!(out.diaphragms.len(), 1);
        let d = &out.diaphragms[0];

        assert_approx_eq!(f64, d.mass, d.slaves.iter().map(|s| s.mass).sum::<f64>());
        assert_approx_eq!(f64, d.mass, 100.0);
        // Every corner is sqrt(5) from the centroid (2, 1)
        assert_approx_eq!(f64, d.rotational_inertia, 100.0 * 5.0, epsilon = 1e-9);
        assert_eq!(d.mass_source, MassSource::Explicit);

        let master = registry.get(d.master).unwrap();
        assert_eq!(master.kind, NodeKind::DiaphragmMaster);
        assert_eq!(master.coordinate, Vec3::new(2.0, 1.0, 3.0));
        assert_eq!(d.fix_mask.as_flags(), [0, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn test_slab_mass_split_evenly() {
        let (_, result) = run(
            r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 10 0
  POINT "3" 10 10
  POINT "4" 0 10
$ POINT ASSIGNS
  POINTASSIGN "1" "L1" DIAPH "D1"
  POINTASSIGN "2" "L1" DIAPH "D1"
  POINTASSIGN "3" "L1" DIAPH "D1"
  POINTASSIGN "4" "L1" DIAPH "D1"
"#,
        );
        let (_, out) = result.unwrap();
        let d = &out.diaphragms[0];
        assert_approx_eq!(f64, d.area, 100.0);
        assert_approx_eq!(f64, d.mass, 2500.0 * 0.10 * 100.0, epsilon = 1e-6);
        assert!(d.slaves.iter().all(|s| (s.mass - 6250.0).abs() < 1e-6));
        assert_eq!(d.mass_source, MassSource::Slab);
    }

    #[test]
    fn test_supported_story_skipped_with_conflict() {
        let (_, result) = run(
            r#"
$ STORIES
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 5 0
$ POINT ASSIGNS
  POINTASSIGN "1" "Base" DIAPH "D1" RESTRAINT "UX UY UZ RX RY RZ"
  POINTASSIGN "2" "Base" DIAPH "D1"
"#,
        );
        let (registry, out) = result.unwrap();
        assert!(out.diaphragms.is_empty());
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].error_code(), "CONSTRAINT_CONFLICT");
        assert!(registry.iter().all(|n| n.kind != NodeKind::DiaphragmMaster));
    }

    #[test]
    fn test_single_labelled_node() {
        let (_, result) = run(
            r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "3" 5 5 0.4
$ POINT ASSIGNS
  POINTASSIGN "1" "L1" DIAPH "D1"
  POINTASSIGN "3" "L1" DIAPH "D1"
"#,
        );
        // Point 3 sits below the plane, leaving one slave
        let (_, out) = result.unwrap();
        assert!(out.diaphragms.is_empty());
        assert!(out.conflicts.is_empty());
    }

    #[test]
    fn test_mixed_labels_skip_story() {
        let (_, result) = run(
            r#"
$ STORIES
  STORY "L2" HEIGHT 3
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 5 0
  POINT "3" 5 5
$ POINT ASSIGNS
  POINTASSIGN "1" "L2" DIAPH "D1"
  POINTASSIGN "2" "L2" DIAPH "D1"
  POINTASSIGN "3" "L2" DIAPH "DISCONNECTED"
  POINTASSIGN "1" "L1" DIAPH "D1"
  POINTASSIGN "2" "L1" DIAPH "D1"
  POINTASSIGN "3" "L1" MASS 5
"#,
        );
        let (registry, out) = result.unwrap();
        assert!(out.diaphragms.is_empty());
        assert!(registry.iter().all(|n| n.kind != NodeKind::DiaphragmMaster));

        let stories: Vec<String> = out
            .conflicts
            .iter()
            .map(|e| match e {
                ModelError::ConstraintConflict { story, reason } => {
                    assert!(reason.contains("labels"), "{reason}");
                    story.clone()
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(stories, ["L2", "L1"]);
    }

    #[test]
    fn test_undeclared_label_rejected() {
        let text = r#"
$ STORIES
  STORY "L1" ELEV 0
$ DIAPHRAGM NAMES
  DIAPHRAGM "D1"
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 5 0
$ POINT ASSIGNS
  POINTASSIGN "1" "L1" DIAPH "D1"
  POINTASSIGN "2" "L1" DIAPH "D9"
"#;
        let err = build_story_graph(&parse_model(text).unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "UNDEFINED_REFERENCE");
    }
}
