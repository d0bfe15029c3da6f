//! # Pipeline
//!
//! [`ModelBuilder`] turns a story graph into an [`ArtifactSet`]. It owns the
//! node registry for the duration of one build and runs the stages in a fixed
//! order, so every constraint sees every node it may tie:
//!
//! 1. grid nodes for every placed (point, story)
//! 2. point restraints
//! 3. members, story by story from the top, columns then beams then the rest
//! 4. spring connectors and their ground nodes
//! 5. rigid diaphragms
//!
//! Unresolved references and degenerate members are recorded as skips and the
//! build carries on. Any other error aborts it.
//!
//! ## Example
//!
//! ```rust
//! use frame_core::config::BuildConfig;
//! use frame_core::parser::parse_model;
//! use frame_core::pipeline::ModelBuilder;
//! use frame_core::story::build_story_graph;
//!
//! let parsed = parse_model(r#"
//! $ STORIES
//!   STORY "L1" HEIGHT 3
//!   STORY "Base" ELEV 0
//! $ POINT COORDINATES
//!   POINT "1" 0 0
//! $ LINE CONNECTIVITIES
//!   LINE "C1" COLUMN "1" "1"
//! $ POINT ASSIGNS
//!   POINTASSIGN "1" "Base" RESTRAINT "UX UY UZ RX RY RZ"
//! $ LINE ASSIGNS
//!   LINEASSIGN "C1" "L1"
//! "#).unwrap();
//!
//! let graph = build_story_graph(&parsed).unwrap();
//! let artifacts = ModelBuilder::new(BuildConfig::default()).build(&graph).unwrap();
//! assert_eq!(artifacts.model.elements.len(), 1);
//! assert!(!artifacts.blocks_execution());
//! ```

use log::{info, warn};

use crate::artifacts::{ArtifactSet, FrameModel, SCHEMA_VERSION};
use crate::config::BuildConfig;
use crate::constraints::{generate_diaphragms, generate_springs, generate_supports};
use crate::elements::{place_member, ElementContext, FrameElement};
use crate::errors::{ModelError, ModelResult};
use crate::nodes::{NodeRegistry, NodeResolver, TagScheme};
use crate::parser::LineKind;
use crate::story::StoryGraph;
use crate::validation::validate;

/// Member emission order within a story
const KIND_ORDER: [&[LineKind]; 3] = [&[LineKind::Column], &[LineKind::Beam], &[LineKind::Brace, LineKind::Other]];

/// Builds artifact sets under one configuration.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    config: BuildConfig,
}

impl ModelBuilder {
    pub fn new(config: BuildConfig) -> Self {
        ModelBuilder { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run every build stage and validate the result.
    pub fn build(&self, graph: &StoryGraph) -> ModelResult<ArtifactSet> {
        let scheme = TagScheme::new(graph.stories.len());
        let resolver = NodeResolver::new(graph, scheme);
        let mut registry = NodeRegistry::new();
        let mut skips: Vec<ModelError> = Vec::new();

        info!(strategy = self.config.strategy.as_str(), stories = graph.stories.len(); "Building frame model");

        // 1. grid nodes
        for (story_index, points) in graph.active_points.iter().enumerate() {
            for id in points.keys() {
                let subject = format!("point assignment '{id}'");
                record(resolver.resolve(&mut registry, id, story_index, &subject), &mut skips)?;
            }
        }

        // 2. supports
        let mut supports = generate_supports(&resolver, &registry);

        // 3. members
        let ctx = ElementContext {
            scheme,
            config: &self.config,
            graph,
        };
        let mut elements: Vec<FrameElement> = Vec::new();
        for lines in &graph.active_lines {
            for kinds in KIND_ORDER {
                for line in lines.iter().filter(|l| kinds.contains(&l.kind)) {
                    let Some(ends) = record(place_member(&resolver, &mut registry, line), &mut skips)? else {
                        continue;
                    };
                    if let Some(built) = record(ctx.materialize(&mut registry, line, &ends), &mut skips)? {
                        elements.extend(built);
                    }
                }
            }
        }

        // 4. springs
        let (springs, ground_supports) = generate_springs(&resolver, &mut registry)?;
        supports.extend(ground_supports);

        // 5. diaphragms
        let diaphragms = generate_diaphragms(
            &resolver,
            &mut registry,
            &supports,
            &self.config.diaphragm,
            &self.config.tolerances,
        )?;

        let model = FrameModel {
            stories: graph.stories.clone(),
            nodes: registry.into_nodes(),
            elements,
            diaphragms: diaphragms.diaphragms,
            springs,
            supports,
        };
        let validation = validate(&model, &self.config.tolerances);

        info!(
            nodes = model.nodes.len(),
            elements = model.elements.len(),
            diaphragms = model.diaphragms.len(),
            springs = model.springs.connectors.len(),
            skips = skips.len();
            "Built frame model"
        );

        Ok(ArtifactSet {
            schema_version: SCHEMA_VERSION.to_string(),
            strategy: self.config.strategy,
            model,
            skips,
            conflicts: diaphragms.conflicts,
            validation,
        })
    }
}

/// Keep a value, record a non-fatal error as a skip, or propagate a fatal one
fn record<T>(result: ModelResult<T>, skips: &mut Vec<ModelError>) -> ModelResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if !err.is_fatal() => {
            warn!(code = err.error_code(); "{err}");
            skips.push(err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
