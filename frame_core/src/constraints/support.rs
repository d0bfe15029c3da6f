//! Point restraints.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::nodes::{NodeRegistry, NodeResolver};

use super::DofMask;

/// Where a support entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportSource {
    /// `RESTRAINT` on a point assignment
    PointRestraint,
    /// Fully fixed ground node of a spring connector
    SpringGround,
}

/// External restraint on one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub node: u64,
    pub mask: DofMask,
    pub source: SupportSource,
}

/// Supports for every registered grid node whose assignment carries a restraint.
///
/// All-free masks are ignored. Output follows story order, then assignment order.
pub fn generate_supports(resolver: &NodeResolver<'_>, registry: &NodeRegistry) -> Vec<Support> {
    let graph = resolver.graph();
    let mut supports = Vec::new();
    for points in &graph.active_points {
        for point in points.values() {
            let Some(mask) = point.restraint.filter(|m| !m.is_free()) else {
                continue;
            };
            let Some(tag) = resolver.tag_of(&point.id, point.story_index) else {
                continue;
            };
            if !registry.contains(tag) {
                debug!(point = point.id.as_str(), story_index = point.story_index; "Restraint on unplaced point ignored");
                continue;
            }
            supports.push(Support {
                node: tag,
                mask,
                source: SupportSource::PointRestraint,
            });
        }
    }
    supports
}
