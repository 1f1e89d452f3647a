//! QRC Core - Concept graph model, normalization and shared types
//!
//! This crate defines the core abstractions used by the concept map pipeline:
//! - Graph models (entities, relationships, the bounded concept graph)
//! - Identifier normalization
//! - The unparseable-source sentinel shared with the summarizer
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConceptMapConfig, ConfigError, Direction, EnvOverrides, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for QRC operations
#[derive(Error, Debug)]
pub enum QrcError {
    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Pattern error: {0}")]
    PatternError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for QrcError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QrcError>;

// ============================================================================
// Sentinel
// ============================================================================

/// Marker the summarizer writes in place of a summary when the source PDF
/// could not be parsed. Text carrying it must never reach the pipeline.
pub const UNPARSEABLE_SENTINEL: &str = "⚠️ Unable to parse PDF";

/// Check whether a summary carries the unparseable-source sentinel
pub fn is_unparseable(summary: &str) -> bool {
    summary.contains(UNPARSEABLE_SENTINEL)
}

// ============================================================================
// Normalization
// ============================================================================

/// Separator placed between the words of a normalized id
pub const ID_SEPARATOR: char = '_';

/// Derive an entity id from surface text.
///
/// Lowercases, maps every run of non-alphanumeric characters to a single
/// `_` and trims separators at both ends. The result is empty when the input
/// has no alphanumeric characters; callers discard such phrases.
///
/// ```
/// use qrc_core::normalize_id;
///
/// assert_eq!(normalize_id("  Surface   Code "), "surface_code");
/// assert_eq!(normalize_id("Pauli-Operator (X)"), "pauli_operator_x");
/// assert_eq!(normalize_id("--"), "");
/// ```
pub fn normalize_id(surface: &str) -> String {
    let mut id = String::with_capacity(surface.len());
    let mut pending_separator = false;

    for ch in surface.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_separator && !id.is_empty() {
                id.push(ID_SEPARATOR);
            }
            pending_separator = false;
            id.push(ch);
        } else {
            pending_separator = true;
        }
    }

    id
}

// ============================================================================
// Graph Models
// ============================================================================

/// A recognized concept (graph node)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Normalized identifier, unique within a graph
    pub id: String,

    /// Display text: the first surface form seen for this id
    pub label: String,

    /// Number of mentions that contributed to this entity
    pub frequency: usize,
}

impl Entity {
    /// Create an entity from its first surface form.
    ///
    /// Returns `None` when the surface text normalizes to an empty id.
    pub fn from_surface(surface: &str) -> Option<Self> {
        let id = normalize_id(surface);
        if id.is_empty() {
            return None;
        }

        Some(Self {
            id,
            label: surface.split_whitespace().collect::<Vec<_>>().join(" "),
            frequency: 1,
        })
    }
}

/// Where a relationship came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    /// Sentence-level relation phrase between two mentions
    #[default]
    Pattern,
    /// Fixed domain rule fired by co-occurring entities
    DomainRule,
}

impl std::fmt::Display for EdgeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::DomainRule => write!(f, "domain_rule"),
        }
    }
}

/// A directed, labeled connection between two entities (graph edge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id
    pub source: String,

    /// Relation label from the lexicon vocabulary
    pub relation: String,

    /// Target entity id
    pub target: String,

    /// Extraction pass that produced the edge (not part of its identity)
    #[serde(default)]
    pub origin: EdgeOrigin,
}

impl Relationship {
    /// Create a pattern relationship
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
            origin: EdgeOrigin::Pattern,
        }
    }

    /// Set origin
    pub fn with_origin(mut self, origin: EdgeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Identity key `(source, relation, target)`
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.source, &self.relation, &self.target)
    }

    /// Whether the edge points back at its own source
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Bounded concept graph for one summary text.
///
/// Nodes keep first-seen order and edges keep discovery order; both orders
/// are what the renderer walks, so equal graphs always render equally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConceptGraph {
    nodes: Vec<Entity>,
    edges: Vec<Relationship>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ConceptGraph {
    /// Build a graph from already-assembled parts, checking every invariant
    pub fn from_parts(nodes: Vec<Entity>, edges: Vec<Relationship>) -> Result<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(QrcError::ValidationError(format!(
                    "node at position {} has an empty id",
                    i
                )));
            }
            if index.insert(node.id.clone(), i).is_some() {
                return Err(QrcError::ValidationError(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
        }

        let graph = Self {
            nodes,
            edges,
            index,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Check referential integrity, self-loops and edge uniqueness
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<(&str, &str, &str)> = HashSet::with_capacity(self.edges.len());

        for edge in &self.edges {
            if edge.is_self_loop() {
                return Err(QrcError::ValidationError(format!(
                    "self-loop on {}",
                    edge.source
                )));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !self.index.contains_key(endpoint.as_str()) {
                    return Err(QrcError::ValidationError(format!(
                        "edge {} -{}-> {} references unknown node {}",
                        edge.source, edge.relation, edge.target, endpoint
                    )));
                }
            }
            if !seen.insert(edge.key()) {
                return Err(QrcError::ValidationError(format!(
                    "duplicate edge {} -{}-> {}",
                    edge.source, edge.relation, edge.target
                )));
            }
        }

        Ok(())
    }

    /// Nodes in first-seen order
    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    /// Edges in discovery order
    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that no edge touches, in first-seen order
    pub fn isolated_nodes(&self) -> impl Iterator<Item = &Entity> {
        let connected: HashSet<&str> = self
            .edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();

        self.nodes
            .iter()
            .filter(move |n| !connected.contains(n.id.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entity(id: &str, frequency: usize) -> Entity {
        Entity {
            id: id.to_string(),
            label: id.replace('_', " "),
            frequency,
        }
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("Surface Code"), "surface_code");
        assert_eq!(normalize_id("surface\tcode"), "surface_code");
        assert_eq!(normalize_id("  Quantum   Error Correction  "), "quantum_error_correction");
        assert_eq!(normalize_id("T-gate, magic state!"), "t_gate_magic_state");
        assert_eq!(normalize_id("...!?"), "");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn test_entity_from_surface() {
        let e = Entity::from_surface("Surface  Code").unwrap();
        assert_eq!(e.id, "surface_code");
        assert_eq!(e.label, "Surface Code");
        assert_eq!(e.frequency, 1);

        assert!(Entity::from_surface(" -- ").is_none());
    }

    #[test]
    fn test_sentinel_detection() {
        let summary = format!("# Title\n\n{}: download failed", UNPARSEABLE_SENTINEL);
        assert!(is_unparseable(&summary));
        assert!(!is_unparseable("# Surface codes\n\nA normal summary."));
    }

    #[test]
    fn test_graph_from_parts() {
        let graph = ConceptGraph::from_parts(
            vec![entity("surface_code", 2), entity("syndrome_measurement", 1)],
            vec![Relationship::new("surface_code", "uses", "syndrome_measurement")],
        )
        .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node("surface_code").unwrap().frequency, 2);
        assert!(graph.node("logical_qubit").is_none());
        assert_eq!(graph.isolated_nodes().count(), 0);
    }

    #[test]
    fn test_graph_rejects_dangling_edge() {
        let result = ConceptGraph::from_parts(
            vec![entity("surface_code", 1)],
            vec![Relationship::new("surface_code", "uses", "missing")],
        );
        assert!(matches!(result, Err(QrcError::ValidationError(_))));
    }

    #[test]
    fn test_graph_rejects_self_loop_and_duplicates() {
        let nodes = vec![entity("a", 1), entity("b", 1)];

        let self_loop = ConceptGraph::from_parts(nodes.clone(), vec![Relationship::new("a", "uses", "a")]);
        assert!(self_loop.is_err());

        let duplicate = ConceptGraph::from_parts(
            nodes.clone(),
            vec![
                Relationship::new("a", "uses", "b"),
                Relationship::new("a", "uses", "b").with_origin(EdgeOrigin::DomainRule),
            ],
        );
        assert!(duplicate.is_err());

        let duplicate_node = ConceptGraph::from_parts(vec![entity("a", 1), entity("a", 2)], vec![]);
        assert!(duplicate_node.is_err());
    }

    #[test]
    fn test_isolated_nodes_keep_order() {
        let graph = ConceptGraph::from_parts(
            vec![entity("a", 1), entity("b", 1), entity("c", 1), entity("d", 1)],
            vec![Relationship::new("b", "enables", "c")],
        )
        .unwrap();

        let isolated: Vec<&str> = graph.isolated_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(isolated, vec!["a", "d"]);
    }

    #[test]
    fn test_graph_json_shape() {
        let graph = ConceptGraph::from_parts(
            vec![entity("a", 1), entity("b", 3)],
            vec![Relationship::new("a", "runs_on", "b").with_origin(EdgeOrigin::DomainRule)],
        )
        .unwrap();

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][1]["frequency"], 3);
        assert_eq!(json["edges"][0]["origin"], "domain_rule");
        assert!(json.get("index").is_none());
    }

    proptest! {
        #[test]
        fn normalize_id_is_idempotent(s in "[a-zA-Z0-9 _.,;:()\\-]{0,48}") {
            let once = normalize_id(&s);
            prop_assert_eq!(normalize_id(&once), once.clone());
            prop_assert!(!once.starts_with(ID_SEPARATOR));
            prop_assert!(!once.ends_with(ID_SEPARATOR));
            prop_assert!(!once.contains("__"));
        }
    }
}
