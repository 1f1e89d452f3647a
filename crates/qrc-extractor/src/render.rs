//! Diagram rendering
//!
//! Serializes a [`ConceptGraph`] into Mermaid flowchart text. Output depends
//! only on the graph's node and edge order, so equal graphs always produce
//! byte-identical diagrams.

use std::collections::HashSet;

use qrc_core::{ConceptGraph, ConceptMapConfig, Direction, Entity};

const INDENT: &str = "    ";

/// Mermaid `graph` renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MermaidRenderer {
    direction: Direction,
    declare_isolated_nodes: bool,
    max_label_words: usize,
}

impl Default for MermaidRenderer {
    fn default() -> Self {
        Self {
            direction: Direction::TopDown,
            declare_isolated_nodes: false,
            max_label_words: 4,
        }
    }
}

impl MermaidRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer settings taken from the pipeline configuration
    pub fn from_config(config: &ConceptMapConfig) -> Self {
        Self {
            direction: config.direction,
            declare_isolated_nodes: config.declare_isolated_nodes,
            max_label_words: config.max_label_words.max(1),
        }
    }

    /// Also emit nodes that have no edges
    pub fn with_isolated_nodes(mut self, declare: bool) -> Self {
        self.declare_isolated_nodes = declare;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Header line, e.g. `graph TD`
    pub fn header(&self) -> String {
        format!("graph {}", self.direction)
    }

    pub fn render(&self, graph: &ConceptGraph) -> String {
        let mut out = self.header();
        let mut labelled: HashSet<&str> = HashSet::new();

        for edge in graph.edges() {
            let source = self.reference(graph, &edge.source, &mut labelled);
            let target = self.reference(graph, &edge.target, &mut labelled);
            out.push_str(&format!("\n{INDENT}{source} -->|{}| {target}", edge.relation));
        }

        if self.declare_isolated_nodes {
            for node in graph.isolated_nodes() {
                out.push_str(&format!("\n{INDENT}{}{}", node.id, self.bracket(node)));
            }
        }

        out
    }

    /// Node reference: labelled on first use, bare id afterwards
    fn reference<'g>(&self, graph: &'g ConceptGraph, id: &'g str, labelled: &mut HashSet<&'g str>) -> String {
        match graph.node(id) {
            Some(node) if labelled.insert(id) => format!("{}{}", id, self.bracket(node)),
            _ => id.to_string(),
        }
    }

    /// `[Label]`, or `["Label"]` when the label carries Mermaid syntax characters
    fn bracket(&self, node: &Entity) -> String {
        let label = node
            .label
            .split_whitespace()
            .take(self.max_label_words)
            .collect::<Vec<_>>()
            .join(" ");

        let plain = label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '\'' | '.' | ',' | ':' | '/' | '+'));

        if plain {
            format!("[{}]", label)
        } else {
            format!("[\"{}\"]", label.replace('"', "#quot;"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
