//! QRC Extractor - Concept map pipeline
//!
//! Implements Named Entity Recognition (NER), Relation Extraction (RE),
//! graph assembly and Mermaid rendering for paper summaries.
//!
//! ```text
//! summary ─▶ SummaryDocument ─▶ RuleBasedNer ─▶ RuleBasedRe ─▶ GraphAssembler ─▶ MermaidRenderer
//! ```

use qrc_core::{ConceptGraph, ConceptMapConfig, Relationship, Result};

pub mod graph;
pub mod lexicon;
pub mod ner;
pub mod relation;
pub mod render;
pub mod summary;

pub use graph::GraphAssembler;
pub use lexicon::{DomainRule, Lexicon, LexiconError, RelationEntry};
pub use ner::{EntitySet, RuleBasedNer};
pub use relation::{split_sentences, RuleBasedRe};
pub use render::MermaidRenderer;
pub use summary::SummaryDocument;

/// How a mention was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// Matched a lexicon term
    DomainTerm,
    /// Run of capitalized words outside the lexicon
    CapitalizedPhrase,
}

/// One positioned occurrence of an entity in the prose
#[derive(Debug, Clone)]
pub struct Mention {
    /// Arena position of the entity in its [`EntitySet`]
    pub entity: usize,
    pub start: usize,
    pub end: usize,
    pub kind: MentionKind,
}

/// Trait for entity extractors
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<EntitySet>;
}

/// Trait for relation extractors
pub trait RelationExtractor: Send + Sync {
    fn extract(&self, text: &str, entities: &EntitySet) -> Result<Vec<Relationship>>;
}

// ============================================================================
// Pipeline facade
// ============================================================================

/// Text to concept map pipeline.
///
/// Compiles the lexicon once; afterwards every call is a pure function of
/// its input text, so one instance can be shared across threads.
pub struct ConceptMapper {
    config: ConceptMapConfig,
    ner: Box<dyn EntityExtractor>,
    re: Box<dyn RelationExtractor>,
    assembler: GraphAssembler,
    renderer: MermaidRenderer,
}

impl ConceptMapper {
    /// Create a pipeline from explicit settings and tables
    pub fn new(config: ConceptMapConfig, lexicon: &Lexicon) -> Result<Self> {
        config.validate()?;
        lexicon.validate()?;

        let ner = RuleBasedNer::new(lexicon)?.with_max_phrase_words(config.max_phrase_words);
        let re = RuleBasedRe::new(lexicon)?;

        tracing::debug!(
            terms = lexicon.terms.len(),
            relations = lexicon.relations.len(),
            rules = lexicon.rules.len(),
            "Lexicon compiled"
        );

        Ok(Self {
            assembler: GraphAssembler::new(config.max_nodes, config.max_edges),
            renderer: MermaidRenderer::from_config(&config),
            ner: Box::new(ner),
            re: Box::new(re),
            config,
        })
    }

    /// Default settings with the built-in quantum lexicon
    pub fn with_defaults() -> Result<Self> {
        Self::new(ConceptMapConfig::default(), &Lexicon::quantum())
    }

    /// Use the lexicon file named in the config, or the built-in tables
    pub fn from_config(config: ConceptMapConfig) -> Result<Self> {
        let lexicon = match &config.lexicon_path {
            Some(path) => Lexicon::from_file(path)?,
            None => Lexicon::quantum(),
        };
        Self::new(config, &lexicon)
    }

    pub fn config(&self) -> &ConceptMapConfig {
        &self.config
    }

    /// Entities of a summary: prose mentions first, then structured terms
    pub fn extract_entities(&self, text: &str) -> Result<EntitySet> {
        let document = SummaryDocument::parse(text);
        self.entities_of(&document)
    }

    fn entities_of(&self, document: &SummaryDocument) -> Result<EntitySet> {
        let mut entities = self.ner.extract(&document.prose)?;
        for term in document.structured_terms() {
            entities.record(term);
        }
        Ok(entities)
    }

    /// Run extraction and assembly without rendering
    pub fn build_graph(&self, text: &str) -> Result<ConceptGraph> {
        let document = SummaryDocument::parse(text);
        let entities = self.entities_of(&document)?;
        let candidates = self.re.extract(&document.prose, &entities)?;

        tracing::debug!(
            entities = entities.len(),
            mentions = entities.mentions().len(),
            candidates = candidates.len(),
            "Extraction finished"
        );

        let graph = self.assembler.assemble(&entities, candidates)?;

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Graph assembled"
        );

        Ok(graph)
    }

    pub fn render(&self, graph: &ConceptGraph) -> String {
        self.renderer.render(graph)
    }

    /// Summary text to Mermaid diagram
    pub fn create_concept_map(&self, text: &str) -> Result<String> {
        let graph = self.build_graph(text)?;
        Ok(self.render(&graph))
    }
}

impl std::fmt::Debug for ConceptMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptMapper")
            .field("config", &self.config)
            .field("assembler", &self.assembler)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qrc_core::QrcError;

    #[test]
    fn test_mapper_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConceptMapper>();
    }

    #[test]
    fn test_create_concept_map_basic() {
        let mapper = ConceptMapper::with_defaults().unwrap();
        let diagram = mapper
            .create_concept_map("Surface Code uses Syndrome Measurement. Logical Qubit depends on Physical Qubit.")
            .unwrap();

        assert_eq!(
            diagram,
            "graph TD\n    \
             surface_code[Surface Code] -->|uses| syndrome_measurement[Syndrome Measurement]\n    \
             logical_qubit[Logical Qubit] -->|depends_on| physical_qubit[Physical Qubit]"
        );
    }

    #[test]
    fn test_structured_terms_are_counted() {
        let mapper = ConceptMapper::with_defaults().unwrap();
        let text = "# Notes\n\n| Field | Value |\n|---|---|\n| Primary Topic | Surface Code |\n\nThe surface code is robust.\n\n## Glossary\n| Term | Definition |\n|---|---|\n| Magic State | Resource state |\n";
        let entities = mapper.extract_entities(text).unwrap();

        assert_eq!(entities.get("surface_code").unwrap().frequency, 2);
        assert_eq!(entities.get("magic_state").unwrap().frequency, 1);
        // Structured terms carry no position
        assert!(entities
            .mentions()
            .iter()
            .all(|m| entities.entity_of(m).id != "magic_state"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConceptMapConfig {
            max_label_words: 0,
            ..Default::default()
        };
        let err = ConceptMapper::new(config, &Lexicon::quantum()).unwrap_err();
        assert!(matches!(err, QrcError::ConfigError(_)));
    }

    #[test]
    fn test_missing_lexicon_file() {
        let config = ConceptMapConfig {
            lexicon_path: Some("/nonexistent/lexicon.toml".into()),
            ..Default::default()
        };
        let err = ConceptMapper::from_config(config).unwrap_err();
        assert!(matches!(err, QrcError::InvalidLexicon(_)));
    }

    #[test]
    fn test_config_drives_renderer() {
        let config = ConceptMapConfig {
            direction: qrc_core::Direction::LeftRight,
            ..Default::default()
        };
        let mapper = ConceptMapper::new(config, &Lexicon::quantum()).unwrap();
        assert_eq!(mapper.create_concept_map("").unwrap(), "graph LR");
    }
}
