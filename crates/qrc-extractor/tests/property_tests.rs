//! Property tests for graph invariants and pipeline determinism

use std::collections::HashSet;
use std::sync::LazyLock;

use proptest::prelude::*;
use qrc_core::{normalize_id, ConceptMapConfig};
use qrc_extractor::{split_sentences, ConceptMapper, Lexicon};

/// Fragments that exercise both extraction passes
const FRAGMENTS: &[&str] = &[
    "surface code",
    "Surface Codes",
    "logical qubit",
    "physical qubit",
    "syndrome measurement",
    "decoder",
    "decoherence",
    "quantum noise",
    "quantum error correction",
    "entanglement",
    "fidelity",
    "Google Sycamore Processor",
    "Floquet Code",
    "uses",
    "depends on",
    "enables",
    "is implemented by",
    "improves",
    "the",
    "and",
    "with",
    "0.5%",
    ".",
    ";",
    "!",
    "\n",
    "- ",
    "**",
];

fn summary_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..60).prop_map(|parts| parts.join(" "))
}

/// (max_nodes, max_edges) pairs, from degenerate to roomy
const CAPS: &[(usize, usize)] = &[(0, 0), (1, 0), (2, 1), (3, 5), (7, 3), (15, 20), (19, 24)];

// One compiled mapper per cap pair, shared by every case
static MAPPERS: LazyLock<Vec<ConceptMapper>> = LazyLock::new(|| {
    CAPS.iter()
        .map(|&(max_nodes, max_edges)| {
            let config = ConceptMapConfig {
                max_nodes,
                max_edges,
                declare_isolated_nodes: true,
                ..Default::default()
            };
            ConceptMapper::new(config, &Lexicon::quantum()).unwrap()
        })
        .collect()
});

/// Mapper with the default caps (15, 20)
fn default_mapper() -> &'static ConceptMapper {
    &MAPPERS[5]
}

proptest! {
    #[test]
    fn pipeline_is_deterministic(text in summary_text()) {
        let m = default_mapper();
        let first = m.create_concept_map(&text).unwrap();
        let second = m.create_concept_map(&text).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn graph_invariants_hold(text in summary_text(), caps in 0..CAPS.len()) {
        let (max_nodes, max_edges) = CAPS[caps];
        let graph = MAPPERS[caps].build_graph(&text).unwrap();

        prop_assert!(graph.node_count() <= max_nodes);
        prop_assert!(graph.edge_count() <= max_edges);
        prop_assert!(graph.validate().is_ok());

        let mut keys = HashSet::new();
        for edge in graph.edges() {
            prop_assert!(!edge.is_self_loop());
            prop_assert!(graph.contains_node(&edge.source));
            prop_assert!(graph.contains_node(&edge.target));
            prop_assert!(keys.insert(edge.key()), "duplicate edge {:?}", edge.key());
        }

        let ids: HashSet<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(ids.len(), graph.node_count());
        for node in graph.nodes() {
            prop_assert!(node.frequency >= 1);
            prop_assert_eq!(normalize_id(&node.label), node.id.clone());
        }
    }

    #[test]
    fn diagram_lines_match_graph(text in summary_text()) {
        let m = default_mapper();
        let graph = m.build_graph(&text).unwrap();
        let diagram = m.render(&graph);

        let lines: Vec<&str> = diagram.lines().collect();
        prop_assert_eq!(lines[0], "graph TD");

        let isolated = graph.isolated_nodes().count();
        prop_assert_eq!(lines.len(), 1 + graph.edge_count() + isolated);
        prop_assert!(lines[1..].iter().all(|l| l.starts_with("    ")));
        prop_assert!(!diagram.ends_with('\n'));
    }

    #[test]
    fn sentences_are_in_bounds_and_ordered(text in ".{0,200}") {
        let mut last_end = 0;
        for range in split_sentences(&text) {
            prop_assert!(range.start >= last_end);
            prop_assert!(range.end <= text.len());
            prop_assert!(!text[range.clone()].trim().is_empty());
            last_end = range.end;
        }
    }
}
