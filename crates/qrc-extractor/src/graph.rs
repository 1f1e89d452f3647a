//! Graph assembly
//!
//! Merges recognized entities and candidate edges into a bounded
//! [`ConceptGraph`]: duplicate, self-referencing and dangling edges are
//! skipped, then node and edge caps are applied with a deterministic
//! retention order.

use std::collections::HashSet;

use qrc_core::{ConceptGraph, Entity, Relationship, Result};

use crate::ner::EntitySet;

/// Applies deduplication and capacity limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphAssembler {
    max_nodes: usize,
    max_edges: usize,
}

impl Default for GraphAssembler {
    fn default() -> Self {
        Self::new(15, 20)
    }
}

impl GraphAssembler {
    pub fn new(max_nodes: usize, max_edges: usize) -> Self {
        Self {
            max_nodes,
            max_edges,
        }
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn max_edges(&self) -> usize {
        self.max_edges
    }

    /// Build the final graph.
    ///
    /// Node retention under the cap ranks by frequency (descending), then
    /// first-seen position. Positions are distinct, so the ranking is a total
    /// order. Retained nodes keep first-seen order; retained edges keep
    /// discovery order.
    pub fn assemble(&self, entities: &EntitySet, candidates: Vec<Relationship>) -> Result<ConceptGraph> {
        let mut nodes: Vec<Entity> = entities.entities().to_vec();
        let mut edges = Self::admit_edges(entities, candidates);

        if nodes.len() > self.max_nodes {
            let before = nodes.len();
            nodes = self.retain_top_nodes(nodes);

            let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            edges.retain(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()));

            tracing::debug!(
                dropped = before - nodes.len(),
                max_nodes = self.max_nodes,
                "Node cap applied"
            );
        }

        if edges.len() > self.max_edges {
            tracing::debug!(
                dropped = edges.len() - self.max_edges,
                max_edges = self.max_edges,
                "Edge cap applied"
            );
            edges.truncate(self.max_edges);
        }

        ConceptGraph::from_parts(nodes, edges)
    }

    /// Insert edges in order, skipping self-loops, unknown endpoints and repeated triples
    fn admit_edges(entities: &EntitySet, candidates: Vec<Relationship>) -> Vec<Relationship> {
        let mut seen: HashSet<(String, String, String)> = HashSet::new();
        let mut edges = Vec::with_capacity(candidates.len());

        for edge in candidates {
            if edge.is_self_loop() {
                continue;
            }
            if !entities.contains(&edge.source) || !entities.contains(&edge.target) {
                continue;
            }
            let key = (edge.source.clone(), edge.relation.clone(), edge.target.clone());
            if !seen.insert(key) {
                continue;
            }
            edges.push(edge);
        }

        edges
    }

    fn retain_top_nodes(&self, nodes: Vec<Entity>) -> Vec<Entity> {
        let mut ranked: Vec<usize> = (0..nodes.len()).collect();
        ranked.sort_by(|&a, &b| {
            nodes[b]
                .frequency
                .cmp(&nodes[a].frequency)
                .then(a.cmp(&b))
        });

        let keep: HashSet<usize> = ranked.into_iter().take(self.max_nodes).collect();

        nodes
            .into_iter()
            .enumerate()
            .filter(|(position, _)| keep.contains(position))
            .map(|(_, node)| node)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
