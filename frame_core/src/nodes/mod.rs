//! # Nodes
//!
//! The node table and the registry that owns it. The registry is the single
//! writer for node identities: it is created by the pipeline, passed by
//! `&mut` to each build stage, and handed to the artifact set at the end.
//!
//! ## Example
//!
//! ```rust
//! use frame_core::geometry::Vec3;
//! use frame_core::nodes::{Node, NodeKind, NodeRegistry};
//!
//! let mut registry = NodeRegistry::new();
//! let node = Node::new(60_003, Vec3::new(5.0, 5.0, 12.0), "S1", 3, NodeKind::Grid);
//!
//! registry.register(node.clone()).unwrap();
//! registry.register(node).unwrap(); // identical re-registration is a no-op
//! assert_eq!(registry.len(), 1);
//! ```

pub mod resolver;
pub mod tags;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};
use crate::geometry::Vec3;

pub use resolver::{NodeResolver, Resolution, ResolvedNode};
pub use tags::{End, TagScheme};

/// Role of a node in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A (point, story) placement
    Grid,
    /// Master of a rigid diaphragm
    DiaphragmMaster,
    /// Fixed end of a spring connector
    Ground,
    /// Interface between a rigid end segment and the deformable segment
    Intermediate,
}

/// A node of the finite-element graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag: u64,
    pub coordinate: Vec3,
    /// Owning story name
    pub story: String,
    pub story_index: usize,
    pub kind: NodeKind,
    /// Source point id for grid nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,
}

impl Node {
    pub fn new(tag: u64, coordinate: Vec3, story: impl Into<String>, story_index: usize, kind: NodeKind) -> Self {
        Node {
            tag,
            coordinate,
            story: story.into(),
            story_index,
            kind,
            point: None,
        }
    }

    /// Attach the source point id
    pub fn with_point(mut self, point: impl Into<String>) -> Self {
        self.point = Some(point.into());
        self
    }
}

/// Insertion-ordered node table with collision checking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: IndexMap<u64, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its tag.
    ///
    /// Registering an identical node again is a no-op. A different node under
    /// an existing tag is a [`ModelError::TagCollision`].
    pub fn register(&mut self, node: Node) -> ModelResult<u64> {
        let tag = node.tag;
        if let Some(existing) = self.nodes.get(&tag) {
            if *existing == node {
                return Ok(tag);
            }
            return Err(ModelError::TagCollision {
                tag,
                existing: describe(existing),
                incoming: describe(&node),
            });
        }
        self.nodes.insert(tag, node);
        Ok(tag)
    }

    pub fn get(&self, tag: u64) -> Option<&Node> {
        self.nodes.get(&tag)
    }

    pub fn contains(&self, tag: u64) -> bool {
        self.nodes.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Consume the registry, returning nodes in registration order
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_values().collect()
    }
}

fn describe(node: &Node) -> String {
    match &node.point {
        Some(point) => format!("{:?} node of point '{}' on '{}'", node.kind, point, node.story),
        None => format!("{:?} node on '{}'", node.kind, node.story),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_detected() {
        let mut registry = NodeRegistry::new();
        registry
            .register(Node::new(1003, Vec3::new(0.0, 0.0, 3.0), "L1", 3, NodeKind::Grid).with_point("1"))
            .unwrap();
        let err = registry
            .register(Node::new(1003, Vec3::new(1.0, 0.0, 3.0), "L1", 3, NodeKind::Grid).with_point("1"))
            .unwrap_err();
        assert_eq!(err.error_code(), "TAG_COLLISION");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("point '1'"));
    }

    #[test]
    fn test_registration_order_kept() {
        let mut registry = NodeRegistry::new();
        for tag in [5, 1, 3] {
            registry.register(Node::new(tag, Vec3::ZERO, "Base", 0, NodeKind::Grid)).unwrap();
        }
        let tags: Vec<u64> = registry.iter().map(|n| n.tag).collect();
        assert_eq!(tags, [5, 1, 3]);
        assert!(registry.contains(3));
        assert!(registry.get(4).is_none());
    }
}
