//! Relation Extraction (RE) module
//!
//! Produces candidate edges between recognized entities in two passes:
//! - Pattern pass: one relation phrase per sentence, connecting the nearest
//!   mention before it to the nearest mention after it
//! - Domain-rule pass: fixed triples that fire when both endpoints occur
//!   anywhere in the text
//!
//! Output is the concatenation of both passes. Deduplication belongs to the
//! graph assembler.

use std::cmp::Reverse;
use std::ops::Range;

use regex::Regex;

use crate::lexicon::Lexicon;
use crate::ner::EntitySet;
use crate::{Mention, RelationExtractor};
use qrc_core::{EdgeOrigin, QrcError, Relationship, Result};

// ============================================================================
// Sentence splitting
// ============================================================================

/// Split text into sentence byte ranges.
///
/// Boundaries are `!`, `?`, `;`, line breaks, and `.` when it is followed by
/// whitespace or the end of the text. Decimal numbers ("0.5%") and dotted
/// names ("arXiv.org") therefore stay inside their sentence. Ranges that
/// hold only whitespace are dropped.
pub fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '!' | '?' | ';' | '\n' => true,
            '.' => chars.peek().map_or(true, |&(_, next)| next.is_whitespace()),
            _ => false,
        };

        if boundary {
            push_sentence(text, start..i, &mut sentences);
            start = i + c.len_utf8();
        }
    }
    push_sentence(text, start..text.len(), &mut sentences);

    sentences
}

fn push_sentence(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    if !text[range.clone()].trim().is_empty() {
        out.push(range);
    }
}

// ============================================================================
// Rule-based RE
// ============================================================================

/// Relation vocabulary entry compiled to regexes
#[derive(Debug, Clone)]
struct CompiledRelation {
    label: String,
    active: Option<Regex>,
    passive: Option<Regex>,
}

/// A relation phrase found inside a sentence
#[derive(Debug, Clone, Copy)]
struct PhraseMatch<'r> {
    start: usize,
    end: usize,
    label: &'r str,
    passive: bool,
}

/// Rule-based relation extractor
#[derive(Debug, Clone)]
pub struct RuleBasedRe {
    relations: Vec<CompiledRelation>,
    /// (source id, label, target id)
    rules: Vec<(String, String, String)>,
}

impl RuleBasedRe {
    /// Create a relation extractor from lexicon tables
    pub fn new(lexicon: &Lexicon) -> Result<Self> {
        let relations = lexicon
            .relations
            .iter()
            .filter(|entry| !entry.is_rule_only())
            .map(|entry| {
                Ok(CompiledRelation {
                    label: entry.label.clone(),
                    active: compile_phrases(&entry.phrases)?,
                    passive: compile_phrases(&entry.passive_phrases)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rules = lexicon
            .rules
            .iter()
            .map(|rule| {
                let (source, target) = rule.endpoint_ids();
                (source, rule.relation.clone(), target)
            })
            .collect();

        Ok(Self { relations, rules })
    }

    /// All phrase matches inside `range`, leftmost first, longer first on ties
    fn find_phrases(&self, text: &str, range: &Range<usize>) -> Vec<PhraseMatch<'_>> {
        let sentence = &text[range.clone()];
        let mut found = Vec::new();

        for relation in &self.relations {
            let patterns = [(&relation.active, false), (&relation.passive, true)];
            for (pattern, passive) in patterns {
                let Some(pattern) = pattern else { continue };
                for m in pattern.find_iter(sentence) {
                    found.push(PhraseMatch {
                        start: range.start + m.start(),
                        end: range.start + m.end(),
                        label: &relation.label,
                        passive,
                    });
                }
            }
        }

        found.sort_by_key(|p| (p.start, Reverse(p.end)));
        found
    }

    /// Pattern pass: at most one edge per sentence
    fn find_pattern_relations(&self, text: &str, entities: &EntitySet) -> Vec<Relationship> {
        let mentions = entities.mentions();
        let mut relations = Vec::new();

        for sentence in split_sentences(text) {
            let inside: Vec<&Mention> = mentions
                .iter()
                .filter(|m| m.start >= sentence.start && m.end <= sentence.end)
                .collect();

            if inside.len() < 2 {
                continue;
            }

            for phrase in self.find_phrases(text, &sentence) {
                // A phrase inside an entity name is not a connector
                if inside.iter().any(|m| phrase.start < m.end && m.start < phrase.end) {
                    continue;
                }

                let preceding = inside.iter().rev().find(|m| m.end <= phrase.start);
                let following = inside.iter().find(|m| m.start >= phrase.end);

                if let (Some(before), Some(after)) = (preceding, following) {
                    let (source, target) = if phrase.passive {
                        (after, before)
                    } else {
                        (before, after)
                    };

                    relations.push(Relationship::new(
                        entities.entity_of(source).id.clone(),
                        phrase.label,
                        entities.entity_of(target).id.clone(),
                    ));
                    break;
                }
            }
        }

        relations
    }

    /// Domain-rule pass, in table order
    fn find_rule_relations(&self, entities: &EntitySet) -> Vec<Relationship> {
        self.rules
            .iter()
            .filter(|(source, _, target)| entities.contains(source) && entities.contains(target))
            .map(|(source, relation, target)| {
                Relationship::new(source.clone(), relation.clone(), target.clone())
                    .with_origin(EdgeOrigin::DomainRule)
            })
            .collect()
    }
}

impl RelationExtractor for RuleBasedRe {
    fn extract(&self, text: &str, entities: &EntitySet) -> Result<Vec<Relationship>> {
        let mut relations = self.find_pattern_relations(text, entities);
        relations.extend(self.find_rule_relations(entities));
        Ok(relations)
    }
}

/// Compile a phrase list into one word-bounded, case-insensitive alternation
fn compile_phrases(phrases: &[String]) -> Result<Option<Regex>> {
    let mut alternatives: Vec<String> = phrases
        .iter()
        .map(|p| {
            p.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .filter(|p| !p.is_empty())
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    // Longest first so "depends on" wins over a shorter prefix
    alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| QrcError::PatternError(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
