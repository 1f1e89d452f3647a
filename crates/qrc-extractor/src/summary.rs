//! Summary preprocessing
//!
//! Summaries arrive as Markdown with a fixed layout: a `# Title`, a
//! `| Field | Value |` table, a few `##` sections and a glossary table.
//! This module separates that layout into prose (what the extractors scan)
//! and structured terms (primary topic, glossary entries). Text without the
//! layout passes through as prose with only inline markup removed.
//!
//! Hard-wrapped paragraph lines are joined back into one line, since the
//! extractors treat a line break as a sentence boundary. List items, blank
//! lines and headings still start a new line.

/// Heading of the glossary section, compared case-insensitively
const GLOSSARY_HEADING: &str = "glossary";

/// Field whose value names the paper's main concept
const PRIMARY_TOPIC_FIELD: &str = "primary topic";

/// Table header cells and placeholders that are not terms
const NON_TERMS: &[&str] = &["term", "no terms", "field"];

/// A summary split into prose and structured parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryDocument {
    /// First `# ` heading
    pub title: Option<String>,

    /// Key/value rows outside the glossary, in order
    pub fields: Vec<(String, String)>,

    /// First-column terms of the glossary table
    pub glossary: Vec<String>,

    /// `##` section headings, in order
    pub sections: Vec<String>,

    /// Text scanned by the extractors, one paragraph or list item per line
    pub prose: String,
}

impl SummaryDocument {
    /// Split a summary into its parts. Never fails.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut prose_lines: Vec<String> = Vec::new();
        let mut in_glossary = false;
        // Whether the next plain line continues the last prose line
        let mut joinable = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(heading) = heading_text(trimmed, 1) {
                let heading = strip_markup(heading);
                if doc.title.is_none() {
                    doc.title = Some(heading.clone());
                }
                prose_lines.push(heading);
                in_glossary = false;
                joinable = false;
                continue;
            }

            if trimmed.starts_with("##") {
                let heading = strip_markup(trimmed.trim_start_matches('#').trim());
                in_glossary = heading.to_lowercase().starts_with(GLOSSARY_HEADING);
                doc.sections.push(heading);
                joinable = false;
                continue;
            }

            if trimmed.starts_with('|') {
                doc.read_table_row(trimmed, in_glossary);
                joinable = false;
                continue;
            }

            if trimmed.is_empty() {
                prose_lines.push(String::new());
                joinable = false;
                continue;
            }

            let item = strip_bullet(trimmed);
            let is_list_item = item.len() != trimmed.len();
            let content = strip_markup(item);
            if content.is_empty() {
                continue;
            }

            match prose_lines.last_mut() {
                Some(last) if joinable && !is_list_item => {
                    last.push(' ');
                    last.push_str(&content);
                }
                _ => prose_lines.push(content),
            }
            joinable = true;
        }

        doc.prose = prose_lines.join("\n");
        doc
    }

    fn read_table_row(&mut self, row: &str, in_glossary: bool) {
        let cells: Vec<String> = row
            .trim_matches('|')
            .split('|')
            .map(|cell| strip_markup(cell.trim()))
            .collect();

        if is_separator_row(&cells) {
            return;
        }

        let Some(first) = cells.first().filter(|c| !c.is_empty()) else {
            return;
        };
        if NON_TERMS.contains(&first.to_lowercase().as_str()) {
            return;
        }

        if in_glossary {
            self.glossary.push(first.clone());
        } else if let Some(value) = cells.get(1) {
            self.fields.push((first.clone(), value.clone()));
        }
    }

    /// Value of a key/value field, matched case-insensitively
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn primary_topic(&self) -> Option<&str> {
        self.field(PRIMARY_TOPIC_FIELD).filter(|v| !v.is_empty())
    }

    /// Terms recognized from the layout rather than the prose: the primary
    /// topic first, then glossary entries
    pub fn structured_terms(&self) -> impl Iterator<Item = &str> {
        self.primary_topic()
            .into_iter()
            .chain(self.glossary.iter().map(String::as_str))
    }
}

/// Text of an ATX heading of exactly `level` hashes
fn heading_text(line: &str, level: usize) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes != level {
        return None;
    }
    let rest = &line[level..];
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

/// Drop a leading list marker
fn strip_bullet(line: &str) -> &str {
    for marker in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    if let Some(rest) = line.strip_prefix('•') {
        return rest.trim_start();
    }
    line
}

/// Remove inline emphasis and code markers
fn strip_markup(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect::<String>()
        .trim()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
