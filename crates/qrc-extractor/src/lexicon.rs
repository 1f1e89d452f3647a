//! Lexicon module
//!
//! Declarative tables driving extraction: domain terms, the closed relation
//! vocabulary with its trigger phrases, the domain-rule triples and the stop
//! words trimmed from capitalized phrases. The built-in tables cover quantum
//! computing and physics; a TOML file can replace them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use qrc_core::{normalize_id, QrcError};

// ============================================================================
// Table entries
// ============================================================================

/// A relation label and the phrases that signal it inside a sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEntry {
    /// Edge label, written as-is into the diagram
    pub label: String,

    /// Active phrases: preceding mention -> following mention
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,

    /// Passive phrases ("is implemented by"): following mention -> preceding mention
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passive_phrases: Vec<String>,
}

impl RelationEntry {
    fn new(label: &str, phrases: &[&str], passive_phrases: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            phrases: phrases.iter().map(|s| s.to_string()).collect(),
            passive_phrases: passive_phrases.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Labels without phrases are only reachable through domain rules
    pub fn is_rule_only(&self) -> bool {
        self.phrases.is_empty() && self.passive_phrases.is_empty()
    }
}

/// A known relationship that fires whenever both endpoints are present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl DomainRule {
    fn new(source: &str, relation: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            relation: relation.to_string(),
            target: target.to_string(),
        }
    }

    /// Endpoint ids after normalization
    pub fn endpoint_ids(&self) -> (String, String) {
        (normalize_id(&self.source), normalize_id(&self.target))
    }
}

// ============================================================================
// Lexicon
// ============================================================================

/// The full set of extraction tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    /// Domain phrases matched case-insensitively, longest first
    #[serde(default)]
    pub terms: Vec<String>,

    /// Words trimmed from both ends of capitalized phrases
    #[serde(default)]
    pub stop_words: Vec<String>,

    /// Closed relation vocabulary
    #[serde(default, rename = "relation")]
    pub relations: Vec<RelationEntry>,

    /// Domain-rule triples
    #[serde(default, rename = "rule")]
    pub rules: Vec<DomainRule>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::quantum()
    }
}

impl Lexicon {
    /// Built-in quantum computing / physics tables
    pub fn quantum() -> Self {
        let terms = [
            // Hardware and computation
            "quantum computer",
            "quantum computing",
            "quantum processor",
            "quantum algorithm",
            "quantum gate",
            "quantum circuit",
            "quantum operation",
            "quantum channel",
            "quantum state",
            "qubit",
            "logical qubit",
            "physical qubit",
            "superconducting qubit",
            "trapped ion",
            // Error correction
            "quantum error correction",
            "error correction",
            "surface code",
            "stabilizer code",
            "color code",
            "topological code",
            "code distance",
            "syndrome measurement",
            "decoder",
            "error threshold",
            "fault tolerance",
            "magic state",
            "pauli operator",
            // Physics
            "superposition",
            "entanglement",
            "decoherence",
            "quantum noise",
            "fidelity",
            "gate fidelity",
            "hamiltonian",
            "quantum annealing",
            // Applications
            "variational quantum eigensolver",
            "quantum approximate optimization",
            "quantum machine learning",
            "quantum neural network",
            "quantum cryptography",
            "quantum key distribution",
            "quantum communication",
            "quantum sensing",
            "quantum metrology",
            "quantum simulation",
        ];

        let stop_words = [
            "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
            "by", "this", "that", "these", "those", "we", "our", "its", "their", "novel",
        ];

        let relations = vec![
            RelationEntry::new(
                "uses",
                &["uses", "use", "utilizes", "utilises", "employs", "leverages"],
                &["is used by", "are used by"],
            ),
            RelationEntry::new(
                "depends_on",
                &["depends on", "depend on", "relies on", "rely on", "requires", "require"],
                &[],
            ),
            RelationEntry::new(
                "implements",
                &["implements", "implement", "realizes", "realises", "demonstrates"],
                &["is implemented by", "are implemented by", "is realized by"],
            ),
            RelationEntry::new(
                "enables",
                &["enables", "enable", "allows", "facilitates"],
                &["is enabled by", "are enabled by"],
            ),
            RelationEntry::new(
                "improves",
                &["improves", "improve", "enhances", "optimizes", "optimises", "boosts"],
                &["is improved by", "are improved by"],
            ),
            RelationEntry::new(
                "extends",
                &["extends", "builds upon", "builds on", "generalizes", "generalises"],
                &[],
            ),
            RelationEntry::new("measures", &["measures", "quantifies", "detects"], &[]),
            RelationEntry::new("corrects", &["corrects", "mitigates", "suppresses"], &[]),
            // Rule-only labels
            RelationEntry::new("runs_on", &[], &[]),
            RelationEntry::new("causes", &[], &[]),
        ];

        let rules = vec![
            DomainRule::new("quantum error correction", "uses", "surface code"),
            DomainRule::new("logical qubit", "depends_on", "physical qubit"),
            DomainRule::new("quantum algorithm", "runs_on", "quantum computer"),
            DomainRule::new("decoherence", "causes", "quantum noise"),
            DomainRule::new("syndrome measurement", "enables", "error correction"),
            DomainRule::new("quantum gate", "implements", "quantum operation"),
            DomainRule::new("entanglement", "enables", "quantum communication"),
            DomainRule::new("decoder", "corrects", "quantum noise"),
        ];

        Self {
            terms: terms.iter().map(|s| s.to_string()).collect(),
            stop_words: stop_words.iter().map(|s| s.to_string()).collect(),
            relations,
            rules,
        }
    }

    /// Parse and validate a lexicon from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, LexiconError> {
        let lexicon: Self = toml::from_str(content).map_err(|e| LexiconError::Parse {
            location: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Load and validate a lexicon TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LexiconError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let lexicon: Self = toml::from_str(&content).map_err(|e| LexiconError::Parse {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String, LexiconError> {
        toml::to_string(self).map_err(|e| LexiconError::Parse {
            location: "<serialize>".to_string(),
            message: e.to_string(),
        })
    }

    /// Look up a relation entry by label
    pub fn relation(&self, label: &str) -> Option<&RelationEntry> {
        self.relations.iter().find(|r| r.label == label)
    }

    /// Check the tables before any text is processed
    pub fn validate(&self) -> Result<(), LexiconError> {
        for term in &self.terms {
            if normalize_id(term).is_empty() {
                return Err(LexiconError::EmptyEntry(format!("term {:?}", term)));
            }
        }

        let mut labels = HashSet::new();
        for entry in &self.relations {
            if entry.label.is_empty() || normalize_id(&entry.label) != entry.label {
                return Err(LexiconError::InvalidLabel(entry.label.clone()));
            }
            if !labels.insert(entry.label.as_str()) {
                return Err(LexiconError::DuplicateRelation(entry.label.clone()));
            }
            for phrase in entry.phrases.iter().chain(&entry.passive_phrases) {
                if phrase.split_whitespace().next().is_none() {
                    return Err(LexiconError::EmptyEntry(format!(
                        "phrase for relation {}",
                        entry.label
                    )));
                }
            }
        }

        for rule in &self.rules {
            if !labels.contains(rule.relation.as_str()) {
                return Err(LexiconError::UndefinedRelation {
                    relation: rule.relation.clone(),
                    source_term: rule.source.clone(),
                    target_term: rule.target.clone(),
                });
            }
            let (source, target) = rule.endpoint_ids();
            if source.is_empty() || target.is_empty() {
                return Err(LexiconError::EmptyEntry(format!(
                    "rule endpoint in {:?} -{}-> {:?}",
                    rule.source, rule.relation, rule.target
                )));
            }
            if source == target {
                return Err(LexiconError::SelfLoopRule(source));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Lexicon load and validation errors
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("Failed to read lexicon {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lexicon {location}: {message}")]
    Parse { location: String, message: String },

    #[error("Rule {source_term:?} -{relation}-> {target_term:?} references undefined relation label {relation:?}")]
    UndefinedRelation {
        relation: String,
        source_term: String,
        target_term: String,
    },

    #[error("Relation label declared twice: {0}")]
    DuplicateRelation(String),

    #[error("Relation label must be a normalized identifier: {0:?}")]
    InvalidLabel(String),

    #[error("Lexicon entry normalizes to nothing: {0}")]
    EmptyEntry(String),

    #[error("Rule connects {0} to itself")]
    SelfLoopRule(String),
}

impl From<LexiconError> for QrcError {
    fn from(err: LexiconError) -> Self {
        QrcError::InvalidLexicon(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantum_lexicon_is_valid() {
        let lexicon = Lexicon::quantum();
        lexicon.validate().unwrap();
        assert!(lexicon.terms.len() >= 30);
        assert!(lexicon.relation("uses").is_some());
        assert!(lexicon.relation("runs_on").unwrap().is_rule_only());
    }

    #[test]
    fn test_rule_with_undefined_label_is_rejected() {
        let toml = r#"
            terms = ["surface code", "syndrome measurement"]

            [[relation]]
            label = "uses"
            phrases = ["uses"]

            [[rule]]
            source = "surface code"
            relation = "stabilizes"
            target = "syndrome measurement"
        "#;

        let err = Lexicon::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, LexiconError::UndefinedRelation { ref relation, .. } if relation == "stabilizes"));
    }

    #[test]
    fn test_duplicate_and_invalid_labels() {
        let mut lexicon = Lexicon::quantum();
        lexicon
            .relations
            .push(RelationEntry::new("uses", &["makes use of"], &[]));
        assert!(matches!(
            lexicon.validate(),
            Err(LexiconError::DuplicateRelation(_))
        ));

        let mut lexicon = Lexicon::quantum();
        lexicon
            .relations
            .push(RelationEntry::new("Depends On", &["hinges on"], &[]));
        assert!(matches!(lexicon.validate(), Err(LexiconError::InvalidLabel(_))));
    }

    #[test]
    fn test_empty_entries_and_self_loops() {
        let mut lexicon = Lexicon::quantum();
        lexicon.terms.push("--".to_string());
        assert!(matches!(lexicon.validate(), Err(LexiconError::EmptyEntry(_))));

        let mut lexicon = Lexicon::quantum();
        lexicon
            .rules
            .push(DomainRule::new("Surface Code", "uses", "surface-code"));
        assert!(matches!(lexicon.validate(), Err(LexiconError::SelfLoopRule(_))));
    }

    #[test]
    fn test_toml_roundtrip_of_builtin_tables() {
        let lexicon = Lexicon::quantum();
        let toml = lexicon.to_toml_string().unwrap();
        assert!(toml.contains("[[relation]]"));
        assert!(toml.contains("[[rule]]"));

        let parsed = Lexicon::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, lexicon);
    }

    #[test]
    fn test_lexicon_error_converts_to_core_error() {
        let err: QrcError = LexiconError::DuplicateRelation("uses".to_string()).into();
        assert!(matches!(err, QrcError::InvalidLexicon(_)));
    }
}
