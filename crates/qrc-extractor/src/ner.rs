//! Named Entity Recognition (NER) module
//!
//! Rule-based concept recognition in two passes:
//! - Domain terms: case-insensitive dictionary matching, longest phrase wins
//! - Capitalized phrases: runs of two or more capitalized words that the
//!   dictionary does not already cover
//!
//! Every mention is normalized into an [`EntitySet`], which keeps the
//! first-seen label and counts mentions per id.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::lexicon::Lexicon;
use crate::{EntityExtractor, Mention, MentionKind};
use qrc_core::{normalize_id, Entity, QrcError, Result};

// ============================================================================
// Entity Set
// ============================================================================

/// Entities recognized in one text, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    mentions: Vec<Mention>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `surface`.
    ///
    /// The first surface form of an id becomes its label; later ones only
    /// bump the frequency. Returns the entity's arena position, or `None`
    /// when the surface text normalizes to nothing.
    pub fn record(&mut self, surface: &str) -> Option<usize> {
        let id = normalize_id(surface);
        if id.is_empty() {
            return None;
        }

        if let Some(&position) = self.index.get(&id) {
            self.entities[position].frequency += 1;
            return Some(position);
        }

        let entity = Entity::from_surface(surface)?;
        let position = self.entities.len();
        self.index.insert(id, position);
        self.entities.push(entity);
        Some(position)
    }

    /// Count a positioned occurrence and remember where it was found
    pub fn record_mention(&mut self, surface: &str, start: usize, end: usize, kind: MentionKind) {
        if let Some(entity) = self.record(surface) {
            self.mentions.push(Mention {
                entity,
                start,
                end,
                kind,
            });
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Positioned mentions, ordered by start offset
    pub fn mentions(&self) -> &[Mention] {
        &self.mentions
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Entity behind a mention
    pub fn entity_of(&self, mention: &Mention) -> &Entity {
        &self.entities[mention.entity]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

// ============================================================================
// Rule-based NER
// ============================================================================

/// A raw match before normalization
#[derive(Debug, Clone)]
struct Candidate<'t> {
    surface: &'t str,
    start: usize,
    end: usize,
    kind: MentionKind,
}

/// Rule-based NER using the lexicon's domain terms and a capitalization heuristic
#[derive(Debug, Clone)]
pub struct RuleBasedNer {
    /// Alternation of every domain term, longest first (None for an empty table)
    term_pattern: Option<Regex>,
    /// Runs of capitalized words on one line
    phrase_pattern: Regex,
    /// Lowercased stop words trimmed from phrase ends
    stop_words: HashSet<String>,
    /// Longest capitalized phrase accepted
    max_phrase_words: usize,
}

impl RuleBasedNer {
    /// Create a NER from lexicon tables
    pub fn new(lexicon: &Lexicon) -> Result<Self> {
        Ok(Self {
            term_pattern: Self::compile_terms(&lexicon.terms)?,
            phrase_pattern: compile(r"\b\p{Lu}\p{Ll}+(?:-\p{L}+)*(?:[ \t]+\p{Lu}\p{Ll}+(?:-\p{L}+)*)+\b")?,
            stop_words: lexicon.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            max_phrase_words: 4,
        })
    }

    /// Set the longest capitalized phrase (in words) kept as an entity
    pub fn with_max_phrase_words(mut self, max_phrase_words: usize) -> Self {
        self.max_phrase_words = max_phrase_words.max(2);
        self
    }

    /// Build one alternation over all terms.
    ///
    /// Alternatives are ordered longest first so that the leftmost-first
    /// regex semantics prefer "quantum error correction" over
    /// "error correction" at the same position. Words may be separated by
    /// spaces, tabs or hyphens but never a line break, so a mention always
    /// lies inside one sentence. A plural suffix is accepted outside the
    /// captured surface form.
    fn compile_terms(terms: &[String]) -> Result<Option<Regex>> {
        let mut seen = HashSet::new();
        let mut words: Vec<Vec<&str>> = terms
            .iter()
            .filter(|t| seen.insert(normalize_id(t)))
            .map(|t| {
                t.split(|c: char| c.is_whitespace() || c == '-')
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return Ok(None);
        }

        words.sort_by(|a, b| {
            let len_a: usize = a.iter().map(|w| w.len()).sum::<usize>() + a.len();
            let len_b: usize = b.iter().map(|w| w.len()).sum::<usize>() + b.len();
            len_b.cmp(&len_a).then_with(|| a.cmp(b))
        });

        let alternatives: Vec<String> = words
            .iter()
            .map(|w| {
                w.iter()
                    .map(|word| regex::escape(word))
                    .collect::<Vec<_>>()
                    .join(r"[ \t\-]+")
            })
            .collect();

        let pattern = format!(r"(?i)\b({})(?:e?s)?\b", alternatives.join("|"));
        compile(&pattern).map(Some)
    }

    /// Domain-term pass
    fn extract_by_dictionary<'t>(&self, text: &'t str) -> Vec<Candidate<'t>> {
        let Some(pattern) = &self.term_pattern else {
            return Vec::new();
        };

        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Candidate {
                surface: m.as_str(),
                start: m.start(),
                end: m.end(),
                kind: MentionKind::DomainTerm,
            })
            .collect()
    }

    /// Capitalized-phrase pass over the parts of the text the dictionary left uncovered
    fn extract_by_capitalization<'t>(
        &self,
        text: &'t str,
        covered: &[(usize, usize)],
    ) -> Vec<Candidate<'t>> {
        let mut candidates = Vec::new();

        for run in self.phrase_pattern.find_iter(text) {
            // Word spans inside the run, in absolute offsets
            let words: Vec<(usize, usize)> = run
                .as_str()
                .split([' ', '\t'])
                .scan(run.start(), |offset, word| {
                    let start = *offset;
                    *offset += word.len() + 1;
                    Some((start, start + word.len()))
                })
                .filter(|(s, e)| e > s)
                .collect();

            // Split the run wherever a domain match covers a word
            let mut segment: Vec<(usize, usize)> = Vec::new();
            for span in words {
                let overlaps = covered.iter().any(|&(s, e)| span.0 < e && s < span.1);
                if overlaps {
                    self.push_phrase(text, &segment, &mut candidates);
                    segment.clear();
                } else {
                    segment.push(span);
                }
            }
            self.push_phrase(text, &segment, &mut candidates);
        }

        candidates
    }

    /// Trim stop words off a run of words and keep it if it is still a phrase
    fn push_phrase<'t>(
        &self,
        text: &'t str,
        words: &[(usize, usize)],
        out: &mut Vec<Candidate<'t>>,
    ) {
        let is_stop = |&(s, e): &(usize, usize)| self.stop_words.contains(&text[s..e].to_lowercase());

        let first = words.iter().position(|w| !is_stop(w));
        let last = words.iter().rposition(|w| !is_stop(w));
        let (Some(first), Some(last)) = (first, last) else {
            return;
        };

        let kept = &words[first..=last];
        if kept.len() < 2 || kept.len() > self.max_phrase_words {
            return;
        }

        let start = kept[0].0;
        let end = kept[kept.len() - 1].1;
        out.push(Candidate {
            surface: &text[start..end],
            start,
            end,
            kind: MentionKind::CapitalizedPhrase,
        });
    }
}

impl EntityExtractor for RuleBasedNer {
    fn extract(&self, text: &str) -> Result<EntitySet> {
        let mut candidates = self.extract_by_dictionary(text);

        let covered: Vec<(usize, usize)> = candidates.iter().map(|c| (c.start, c.end)).collect();
        candidates.extend(self.extract_by_capitalization(text, &covered));

        // First-seen order is textual order
        candidates.sort_by_key(|c| (c.start, c.end));

        let mut entities = EntitySet::new();
        for candidate in candidates {
            entities.record_mention(candidate.surface, candidate.start, candidate.end, candidate.kind);
        }

        Ok(entities)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| QrcError::PatternError(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
