//! # Connectivity Validator
//!
//! Static checks on the finished frame model. The validator builds an
//! undirected graph over every node, using frame elements, spring connectors
//! and diaphragm ties as edges, and reports what it finds. It never changes
//! the model.
//!
//! | Check                     | Severity                                   |
//! |---------------------------|--------------------------------------------|
//! | unsupported component     | critical                                   |
//! | duplicate coordinates     | critical                                   |
//! | weak connectivity         | warning                                    |
//! | orphan node               | critical if unrestrained, info otherwise   |
//! | dangling reference        | critical                                   |
//! | zero-length element       | critical                                   |
//! | insufficient restraint    | critical                                   |
//!
//! A node is externally restrained when it appears in the support table with
//! at least one fixed DOF. Diaphragm master fixities do not count.
//!
//! ## Example
//!
//! ```rust
//! use frame_core::artifacts::FrameModel;
//! use frame_core::config::Tolerances;
//! use frame_core::validation::{validate, Check};
//!
//! let report = validate(&FrameModel::default(), &Tolerances::default());
//! assert!(report.blocks_execution()); // nothing restrained
//! assert!(!report.passed(Check::InsufficientRestraint));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::{info, warn};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::artifacts::FrameModel;
use crate::config::Tolerances;

// ============================================================================
// Report types
// ============================================================================

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

/// The individual checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    UnsupportedComponent,
    DuplicateCoordinates,
    WeakConnectivity,
    OrphanNode,
    DanglingReference,
    ZeroLengthElement,
    InsufficientRestraint,
}

impl Check {
    pub const ALL: [Check; 7] = [
        Check::UnsupportedComponent,
        Check::DuplicateCoordinates,
        Check::WeakConnectivity,
        Check::OrphanNode,
        Check::DanglingReference,
        Check::ZeroLengthElement,
        Check::InsufficientRestraint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::UnsupportedComponent => "unsupported_component",
            Check::DuplicateCoordinates => "duplicate_coordinates",
            Check::WeakConnectivity => "weak_connectivity",
            Check::OrphanNode => "orphan_node",
            Check::DanglingReference => "dangling_reference",
            Check::ZeroLengthElement => "zero_length_element",
            Check::InsufficientRestraint => "insufficient_restraint",
        }
    }
}

/// One flagged problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check: Check,
    pub severity: Severity,
    /// Nodes involved
    pub nodes: Vec<u64>,
    /// Elements or connectors involved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<u64>,
    pub message: String,
}

/// Pass/fail of one check. A check passes when it has no warning or critical finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: Check,
    pub passed: bool,
    pub findings: usize,
}

/// One connected component of the node graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Smallest node tag in the component
    pub representative: u64,
    pub size: usize,
    pub supported: bool,
}

/// Result of validating a frame model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
    pub findings: Vec<Finding>,
    pub components: Vec<Component>,
    pub restrained_dofs: usize,
}

impl ValidationReport {
    /// True when any critical finding exists
    pub fn blocks_execution(&self) -> bool {
        self.critical_count() > 0
    }

    pub fn critical_count(&self) -> usize {
        self.count(Severity::Critical)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn passed(&self, check: Check) -> bool {
        self.checks.iter().find(|c| c.check == check).map_or(true, |c| c.passed)
    }

    pub fn findings_for(&self, check: Check) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.check == check)
    }
}

// ============================================================================
// Graph
// ============================================================================

/// Node graph keyed by tag; edges are elements, springs and diaphragm ties
struct NodeGraph {
    graph: UnGraph<u64, ()>,
    index: HashMap<u64, NodeIndex>,
    /// Pairs joined directly by a spring or diaphragm tie
    tied: BTreeSet<(u64, u64)>,
}

impl NodeGraph {
    fn new(model: &FrameModel) -> Self {
        let mut graph = UnGraph::with_capacity(model.nodes.len(), model.elements.len());
        let index = model.nodes.iter().map(|n| (n.tag, graph.add_node(n.tag))).collect();
        NodeGraph {
            graph,
            index,
            tied: BTreeSet::new(),
        }
    }

    /// Add an edge; returns the tags that are not in the node table
    fn connect(&mut self, a: u64, b: u64) -> Vec<u64> {
        match (self.index.get(&a).copied(), self.index.get(&b).copied()) {
            (Some(ia), Some(ib)) => {
                self.graph.add_edge(ia, ib, ());
                Vec::new()
            }
            (ia, ib) => [(a, ia), (b, ib)]
                .into_iter()
                .filter(|(_, i)| i.is_none())
                .map(|(t, _)| t)
                .collect(),
        }
    }

    fn tie(&mut self, a: u64, b: u64) {
        self.tied.insert((a.min(b), a.max(b)));
    }

    fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a frame model.
pub fn validate(model: &FrameModel, tolerances: &Tolerances) -> ValidationReport {
    let mut findings: Vec<Finding> = Vec::new();
    let mut graph = NodeGraph::new(model);
    let mut dangling: BTreeMap<u64, Vec<u64>> = BTreeMap::new();

    for element in &model.elements {
        for missing in graph.connect(element.node_i, element.node_j) {
            dangling.entry(missing).or_default().push(element.tag);
        }
    }
    for spring in &model.springs.connectors {
        for missing in graph.connect(spring.node, spring.ground) {
            dangling.entry(missing).or_default().push(spring.tag);
        }
        graph.tie(spring.node, spring.ground);
    }
    for diaphragm in &model.diaphragms {
        for slave in &diaphragm.slaves {
            for missing in graph.connect(diaphragm.master, slave.node) {
                dangling.entry(missing).or_default().push(diaphragm.master);
            }
            graph.tie(diaphragm.master, slave.node);
        }
    }

    let restrained: BTreeSet<u64> = model
        .supports
        .iter()
        .filter(|s| !s.mask.is_free())
        .map(|s| s.node)
        .collect();
    for support in &model.supports {
        if !graph.index.contains_key(&support.node) {
            dangling.entry(support.node).or_default();
        }
    }

    for (node, referrers) in &dangling {
        findings.push(Finding {
            check: Check::DanglingReference,
            severity: Severity::Critical,
            nodes: vec![*node],
            elements: referrers.clone(),
            message: format!("node {node} is referenced but not defined"),
        });
    }

    let components = components(&graph, &restrained);
    for component in components.iter().filter(|c| !c.supported && c.size >= 2) {
        findings.push(Finding {
            check: Check::UnsupportedComponent,
            severity: Severity::Critical,
            nodes: vec![component.representative],
            elements: Vec::new(),
            message: format!(
                "component of {} nodes containing node {} has no external restraint",
                component.size, component.representative
            ),
        });
    }

    findings.extend(duplicate_coordinates(model, &graph, tolerances.duplicate_distance));

    for node in graph.graph.node_indices() {
        let tag = graph.graph[node];
        let degree = graph.degree(node);
        let is_restrained = restrained.contains(&tag);
        if degree == 0 {
            findings.push(Finding {
                check: Check::OrphanNode,
                severity: if is_restrained { Severity::Info } else { Severity::Critical },
                nodes: vec![tag],
                elements: Vec::new(),
                message: if is_restrained {
                    format!("restrained node {tag} is not connected to anything")
                } else {
                    format!("node {tag} is not connected to anything")
                },
            });
        }
        if degree <= 1 && !is_restrained {
            findings.push(Finding {
                check: Check::WeakConnectivity,
                severity: Severity::Warning,
                nodes: vec![tag],
                elements: Vec::new(),
                message: format!("unrestrained node {tag} has {degree} connection(s)"),
            });
        }
    }

    let coordinates: HashMap<u64, _> = model.nodes.iter().map(|n| (n.tag, n.coordinate)).collect();
    for element in &model.elements {
        if let (Some(a), Some(b)) = (coordinates.get(&element.node_i), coordinates.get(&element.node_j)) {
            let length = a.distance(*b);
            if length <= tolerances.degenerate_length {
                findings.push(Finding {
                    check: Check::ZeroLengthElement,
                    severity: Severity::Critical,
                    nodes: vec![element.node_i, element.node_j],
                    elements: vec![element.tag],
                    message: format!("element {} of line '{}' has length {length:e}", element.tag, element.line),
                });
            }
        }
    }

    let restrained_dofs = model.restrained_dofs();
    if restrained_dofs < 6 {
        findings.push(Finding {
            check: Check::InsufficientRestraint,
            severity: Severity::Critical,
            nodes: restrained.iter().copied().collect(),
            elements: Vec::new(),
            message: format!("only {restrained_dofs} restrained DOF(s), at least 6 are needed"),
        });
    }

    let checks = Check::ALL
        .into_iter()
        .map(|check| {
            let of_check: Vec<&Finding> = findings.iter().filter(|f| f.check == check).collect();
            CheckOutcome {
                check,
                passed: of_check.iter().all(|f| f.severity == Severity::Info),
                findings: of_check.len(),
            }
        })
        .collect();

    let report = ValidationReport {
        checks,
        findings,
        components,
        restrained_dofs,
    };

    if report.blocks_execution() {
        warn!(
            critical = report.critical_count(),
            warnings = report.count(Severity::Warning);
            "Validation found critical problems"
        );
    } else {
        info!(warnings = report.count(Severity::Warning); "Validation passed");
    }
    report
}

fn components(graph: &NodeGraph, restrained: &BTreeSet<u64>) -> Vec<Component> {
    let mut sets = UnionFind::<usize>::new(graph.graph.node_count());
    for edge in graph.graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }
    let labels = sets.into_labeling();

    let mut by_root: BTreeMap<usize, Component> = BTreeMap::new();
    for node in graph.graph.node_indices() {
        let tag = graph.graph[node];
        let entry = by_root.entry(labels[node.index()]).or_insert(Component {
            representative: tag,
            size: 0,
            supported: false,
        });
        entry.size += 1;
        entry.representative = entry.representative.min(tag);
        entry.supported |= restrained.contains(&tag);
    }
    let mut components: Vec<Component> = by_root.into_values().collect();
    components.sort_by_key(|c| c.representative);
    components
}

/// Distinct tags within `tolerance` of each other, sweeping along x
fn duplicate_coordinates(model: &FrameModel, graph: &NodeGraph, tolerance: f64) -> Vec<Finding> {
    let mut order: Vec<usize> = (0..model.nodes.len()).collect();
    order.sort_by(|&a, &b| {
        model.nodes[a]
            .coordinate
            .x
            .total_cmp(&model.nodes[b].coordinate.x)
            .then(model.nodes[a].tag.cmp(&model.nodes[b].tag))
    });

    let mut findings = Vec::new();
    for (k, &a) in order.iter().enumerate() {
        let na = &model.nodes[a];
        for &b in &order[k + 1..] {
            let nb = &model.nodes[b];
            if nb.coordinate.x - na.coordinate.x > tolerance {
                break;
            }
            if na.tag == nb.tag || na.coordinate.distance(nb.coordinate) > tolerance {
                continue;
            }
            let pair = (na.tag.min(nb.tag), na.tag.max(nb.tag));
            if graph.tied.contains(&pair) {
                continue;
            }
            findings.push(Finding {
                check: Check::DuplicateCoordinates,
                severity: Severity::Critical,
                nodes: vec![pair.0, pair.1],
                elements: Vec::new(),
                message: format!(
                    "nodes {} and {} occupy the same point ({:.3}, {:.3}, {:.3})",
                    pair.0, pair.1, na.coordinate.x, na.coordinate.y, na.coordinate.z
                ),
            });
        }
    }
    findings.sort_by_key(|f| (f.nodes[0], f.nodes[1]));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{DofMask, Support, SupportSource};
    use crate::elements::{FrameElement, GeomTransform, RectangularSection, SegmentRole};
    use crate::geometry::Vec3;
    use crate::nodes::{Node, NodeKind};
    use crate::parser::LineKind;

    fn node(tag: u64, x: f64, y: f64, z: f64) -> Node {
        Node::new(tag, Vec3::new(x, y, z), "L1", 0, NodeKind::Grid)
    }

    fn element(tag: u64, i: u64, j: u64) -> FrameElement {
        FrameElement {
            tag,
            node_i: i,
            node_j: j,
            line: format!("M{tag}"),
            kind: LineKind::Beam,
            story: "L1".into(),
            story_index: 0,
            role: SegmentRole::Whole,
            section: None,
            properties: RectangularSection::new(0.4, 0.5).properties(),
            transform: GeomTransform {
                tag,
                vecxz: Vec3::new(0.0, 0.0, 1.0),
                offset_i: Vec3::ZERO,
                offset_j: Vec3::ZERO,
            },
            length: 0.0,
        }
    }

    fn fixed(node: u64) -> Support {
        Support {
            node,
            mask: DofMask::FIXED,
            source: SupportSource::PointRestraint,
        }
    }

    /// Two portal-like pieces, each with its own fixed base
    fn two_supported_pieces() -> FrameModel {
        FrameModel {
            nodes: vec![
                node(1, 0.0, 0.0, 0.0),
                node(2, 0.0, 0.0, 3.0),
                node(3, 5.0, 0.0, 3.0),
                node(4, 20.0, 0.0, 0.0),
                node(5, 20.0, 0.0, 3.0),
                node(6, 25.0, 0.0, 3.0),
            ],
            elements: vec![element(10, 1, 2), element(11, 2, 3), element(12, 4, 5), element(13, 5, 6), element(14, 3, 2)],
            supports: vec![fixed(1), fixed(4)],
            ..Default::default()
        }
    }

    #[test]
    fn test_two_supported_components() {
        let report = validate(&two_supported_pieces(), &Tolerances::default());
        assert_eq!(report.components.len(), 2);
        assert!(report.components.iter().all(|c| c.supported));
        assert!(report.passed(Check::UnsupportedComponent));
        assert_eq!(report.restrained_dofs, 12);
    }

    #[test]
    fn test_floating_component_is_critical() {
        let mut model = two_supported_pieces();
        model.supports.pop();
        let report = validate(&model, &Tolerances::default());

        let floating: Vec<&Finding> = report.findings_for(Check::UnsupportedComponent).collect();
        assert_eq!(floating.len(), 1);
        assert_eq!(floating[0].nodes, vec![4]);
        assert!(report.blocks_execution());
    }

    #[test]
    fn test_duplicate_points_flagged() {
        let mut model = two_supported_pieces();
        model.nodes.push(node(7, 5.0, 0.0, 3.0));
        model.elements.push(element(15, 7, 2));
        let report = validate(&model, &Tolerances::default());

        let duplicates: Vec<&Finding> = report.findings_for(Check::DuplicateCoordinates).collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].nodes, vec![3, 7]);
        assert!(!report.passed(Check::DuplicateCoordinates));
    }

    #[test]
    fn test_weak_and_orphan_nodes() {
        let mut model = two_supported_pieces();
        model.nodes.push(node(8, 40.0, 0.0, 0.0));
        model.nodes.push(node(9, 50.0, 0.0, 0.0));
        model.supports.push(fixed(9));
        let report = validate(&model, &Tolerances::default());

        let orphans: Vec<(u64, Severity)> = report
            .findings_for(Check::OrphanNode)
            .map(|f| (f.nodes[0], f.severity))
            .collect();
        assert_eq!(orphans, vec![(8, Severity::Critical), (9, Severity::Info)]);

        // Node 6 hangs off a single element
        let weak: Vec<u64> = report.findings_for(Check::WeakConnectivity).map(|f| f.nodes[0]).collect();
        assert_eq!(weak, vec![6, 8]);
        assert!(!report.passed(Check::WeakConnectivity));
    }

    #[test]
    fn test_dangling_and_zero_length() {
        let mut model = two_supported_pieces();
        model.elements.push(element(16, 3, 99));
        model.nodes.push(node(17, 5.0, 0.0, 3.0));
        model.elements.push(element(18, 3, 17));
        let report = validate(&model, &Tolerances::default());

        let dangling: Vec<&Finding> = report.findings_for(Check::DanglingReference).collect();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].nodes, vec![99]);
        assert_eq!(dangling[0].elements, vec![16]);
        assert_eq!(report.findings_for(Check::ZeroLengthElement).count(), 1);
    }

    #[test]
    fn test_insufficient_restraint() {
        let mut model = two_supported_pieces();
        model.supports = vec![Support {
            node: 1,
            mask: DofMask::from_names("UX UY UZ").unwrap(),
            source: SupportSource::PointRestraint,
        }];
        let report = validate(&model, &Tolerances::default());
        assert!(!report.passed(Check::InsufficientRestraint));
        assert_eq!(report.restrained_dofs, 3);
    }

    const CANTILEVER: &str = r#"
$ STORIES
  STORY "L1" HEIGHT 3
  STORY "Base" ELEV 0
$ POINT COORDINATES
  POINT "1" 0 0
  POINT "2" 4 0
$ LINE CONNECTIVITIES
  LINE "C1" COLUMN "1" "1"
  LINE "B1" BEAM "1" "2"
$ POINT ASSIGNS
  POINTASSIGN "1" "Base" RESTRAINT "UX UY UZ RX RY RZ"
$ LINE ASSIGNS
  LINEASSIGN "C1" "L1"
  LINEASSIGN "B1" "L1"
"#;

    #[test]
    fn test_cantilever_tip_is_weak() {
        let artifacts = crate::translate(CANTILEVER, crate::BuildConfig::default()).unwrap();
        let report = &artifacts.validation;

        // The fixed base also hangs off one element but is restrained
        let weak: Vec<u64> = report.findings_for(Check::WeakConnectivity).map(|f| f.nodes[0]).collect();
        assert_eq!(weak, vec![2000]);
        assert!(report.findings_for(Check::WeakConnectivity).all(|f| f.severity == Severity::Warning));
        assert!(report.passed(Check::UnsupportedComponent));
        assert!(!report.blocks_execution());
    }

    #[test]
    fn test_restrained_tip_is_not_weak() {
        let text = CANTILEVER.replace(
            "$ LINE ASSIGNS",
            "  POINTASSIGN \"2\" \"L1\" RESTRAINT \"UX UY UZ\"\n$ LINE ASSIGNS",
        );
        let artifacts = crate::translate(&text, crate::BuildConfig::default()).unwrap();
        let report = &artifacts.validation;

        assert_eq!(report.findings_for(Check::WeakConnectivity).count(), 0);
        assert!(report.passed(Check::WeakConnectivity));
        assert_eq!(report.restrained_dofs, 9);
    }
}
