//! Spring connectors to ground.
//!
//! A grid node whose assignment names a spring property gets a fully fixed
//! ground node at the same coordinate and a zero-length connector with one
//! elastic uniaxial material per non-zero direction. Zero directions are
//! omitted, so an all-zero property creates nothing.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};
use crate::nodes::{Node, NodeKind, NodeRegistry, NodeResolver};

use super::{Dof, DofMask, Support, SupportSource};

/// Elastic uniaxial material for one (spring property, direction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringMaterial {
    pub tag: u64,
    pub property: String,
    pub dof: Dof,
    pub stiffness: f64,
}

/// One active direction of a connector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringDirection {
    pub dof: Dof,
    pub material: u64,
}

/// Zero-length connector between a structural node and its ground node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringConnector {
    pub tag: u64,
    pub node: u64,
    pub ground: u64,
    pub property: String,
    pub directions: Vec<SpringDirection>,
}

/// Connectors plus the materials they use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpringTable {
    pub connectors: Vec<SpringConnector>,
    /// Materials in first-use order, unique by tag
    pub materials: Vec<SpringMaterial>,
}

/// Build spring connectors for every registered grid node with a spring reference.
///
/// Returns the table and the support entries of the new ground nodes.
pub fn generate_springs(resolver: &NodeResolver<'_>, registry: &mut NodeRegistry) -> ModelResult<(SpringTable, Vec<Support>)> {
    let graph = resolver.graph();
    let scheme = resolver.scheme();
    let mut table = SpringTable::default();
    let mut supports = Vec::new();

    for points in &graph.active_points {
        for point in points.values() {
            let Some(property) = &point.spring else {
                continue;
            };
            let Some(tag) = resolver.tag_of(&point.id, point.story_index) else {
                continue;
            };
            let Some(node) = registry.get(tag).cloned() else {
                debug!(point = point.id.as_str(), property = property.as_str(); "Spring on unplaced point ignored");
                continue;
            };
            let (ordinal, _, record) = graph.springs.get_full(property).ok_or_else(|| {
                ModelError::undefined("spring property", property, format!("point '{}' on '{}'", point.id, node.story))
            })?;

            let directions: Vec<SpringDirection> = Dof::ALL
                .into_iter()
                .zip(record.values())
                .filter(|(_, k)| *k > 0.0)
                .map(|(dof, k)| {
                    let material = scheme.spring_material(ordinal, dof);
                    if !table.materials.iter().any(|m| m.tag == material) {
                        table.materials.push(SpringMaterial {
                            tag: material,
                            property: property.clone(),
                            dof,
                            stiffness: k,
                        });
                    }
                    SpringDirection { dof, material }
                })
                .collect();
            if directions.is_empty() {
                debug!(point = point.id.as_str(), property = property.as_str(); "Spring has no stiffness, skipped");
                continue;
            }

            let ground = registry.register(Node::new(
                scheme.ground(tag),
                node.coordinate,
                &node.story,
                node.story_index,
                NodeKind::Ground,
            ))?;
            supports.push(Support {
                node: ground,
                mask: DofMask::FIXED,
                source: SupportSource::SpringGround,
            });
            table.connectors.push(SpringConnector {
                tag: scheme.spring_element(tag),
                node: tag,
                ground,
                property: property.clone(),
                directions,
            });
        }
    }

    Ok((table, supports))
}
