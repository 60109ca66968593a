// src/summarize/parse.rs
//! Tolerant parser for the model's `Label: value` record blocks.
//!
//! Every block is judged on its own and tagged; one bad record never hides the
//! good ones around it.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::summarize::types::{Insight, UNCATEGORIZED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Category,
    Summary,
    Source,
    Relevance,
}

impl Field {
    /// Source and relevance are single values; a line below them is chatter.
    fn is_multiline(self) -> bool {
        matches!(self, Field::Title | Field::Category | Field::Summary)
    }
}

/// Outcome of one candidate block.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Valid(Insight),
    Malformed { reason: String },
    InvalidCitation { url: String },
}

/// Everything learned from one batch response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchParse {
    pub insights: Vec<Insight>,
    /// Blocks that had all required fields, before citation checks.
    pub parsed: usize,
    pub parse_failures: usize,
    pub invalid_citations: usize,
}

/// Validation context for one batch.
pub struct ParseContext<'a> {
    pub batch_urls: Vec<&'a str>,
    pub categories: &'a [String],
    pub summary_max_chars: usize,
}

#[derive(Debug, Default)]
struct RawRecord {
    fields: Vec<(Field, String)>,
}

impl RawRecord {
    fn get(&self, f: Field) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == f)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn has(&self, f: Field) -> bool {
        self.fields.iter().any(|(k, _)| *k == f)
    }
}

fn label_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[\s\-\*•#>]*\**\s*(title|headline|category|summary|source[ _]?url|source|url|link|relevance[ _]?score|relevance)\s*\**\s*:\s*\**\s*(.*)$",
        )
        .expect("static label regex")
    })
}

fn field_for(label: &str) -> Field {
    let l = label.to_ascii_lowercase();
    if l == "title" || l == "headline" {
        Field::Title
    } else if l == "category" {
        Field::Category
    } else if l == "summary" {
        Field::Summary
    } else if l.starts_with("relevance") {
        Field::Relevance
    } else {
        Field::Source
    }
}

fn is_delimiter(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.chars().all(|c| c == '-')
}

/// Split a response into candidate records. Blocks without any recognized
/// label (preamble, sign-off) are not candidates.
fn split_records(text: &str) -> Vec<RawRecord> {
    let re = label_regex();
    let mut out = Vec::new();
    let mut current = RawRecord::default();

    let flush = |rec: &mut RawRecord, out: &mut Vec<RawRecord>| {
        let done = std::mem::take(rec);
        if !done.fields.is_empty() {
            out.push(done);
        }
    };

    // only lines directly under a multi-line field extend it
    let mut open_field = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            open_field = false;
            continue;
        }
        if is_delimiter(trimmed) {
            flush(&mut current, &mut out);
            open_field = false;
            continue;
        }
        if let Some(caps) = re.captures(trimmed) {
            let field = field_for(&caps[1]);
            let value = caps[2].trim().trim_end_matches("**").trim().to_string();
            // a second title without a delimiter starts the next record
            if field == Field::Title && current.has(Field::Title) {
                flush(&mut current, &mut out);
            }
            open_field = false;
            if !current.has(field) {
                current.fields.push((field, value));
                open_field = field.is_multiline();
            }
            continue;
        }
        if trimmed.is_empty() || !open_field {
            open_field = false;
            continue;
        }
        if let Some((_, value)) = current.fields.last_mut() {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(trimmed);
        }
    }
    flush(&mut current, &mut out);
    out
}

/// Collapse runs of whitespace to single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap at `max_chars` characters, ending with `…` when cut.
pub fn cap_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

/// Strip wrapping the model tends to put around URLs.
pub fn clean_url(raw: &str) -> String {
    let mut s = raw.trim();
    // markdown link: [text](url)
    if let (Some(open), true) = (s.find("]("), s.ends_with(')')) {
        s = &s[open + 2..s.len() - 1];
    }
    s.trim_matches(|c: char| {
        c.is_whitespace()
            || matches!(c, '<' | '>' | '[' | ']' | '(' | ')' | '"' | '\'' | '`' | '.' | ',' | ';')
    })
    .to_string()
}

fn url_key(url: &str) -> String {
    clean_url(url).trim_end_matches('/').to_string()
}

/// Accepts `0.8`, `80%` and `8/10`; anything outside [0, 1] is dropped.
pub fn parse_relevance(raw: &str) -> Option<f32> {
    let t = raw.trim();
    let value = if let Some(pct) = t.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? / 100.0
    } else if let Some((num, den)) = t.split_once('/') {
        let den = den.trim().parse::<f32>().ok()?;
        if den <= 0.0 {
            return None;
        }
        num.trim().parse::<f32>().ok()? / den
    } else {
        t.parse::<f32>().ok()?
    };
    (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(value)
}

/// Match a cited source against the batch. The whole value is tried first,
/// then each URL-shaped token in it (`Post #1 (https://...)`).
fn resolve_citation<'a>(source: &str, known_urls: &HashMap<String, &'a str>) -> Option<&'a str> {
    if let Some(url) = known_urls.get(&url_key(source)) {
        return Some(*url);
    }
    source
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>' | '[' | ']'))
        .filter(|token| token.contains("://"))
        .find_map(|token| known_urls.get(&url_key(token)).copied())
}

fn canonical_category(raw: Option<&str>, categories: &[String]) -> String {
    let Some(c) = raw.map(collapse_whitespace).filter(|c| !c.is_empty()) else {
        return UNCATEGORIZED.to_string();
    };
    categories
        .iter()
        .find(|known| known.eq_ignore_ascii_case(&c))
        .cloned()
        .unwrap_or(c)
}

fn judge(
    rec: &RawRecord,
    known_urls: &HashMap<String, &str>,
    ctx: &ParseContext<'_>,
) -> RecordOutcome {
    let Some(title) = rec.get(Field::Title) else {
        return RecordOutcome::Malformed {
            reason: "missing title".into(),
        };
    };
    let Some(summary) = rec.get(Field::Summary) else {
        return RecordOutcome::Malformed {
            reason: "missing summary".into(),
        };
    };
    let Some(source) = rec.get(Field::Source) else {
        return RecordOutcome::Malformed {
            reason: "missing source".into(),
        };
    };

    let Some(original) = resolve_citation(source, known_urls) else {
        return RecordOutcome::InvalidCitation {
            url: clean_url(source),
        };
    };

    RecordOutcome::Valid(Insight {
        title: collapse_whitespace(title),
        category: canonical_category(rec.get(Field::Category), ctx.categories),
        summary: cap_chars(&collapse_whitespace(summary), ctx.summary_max_chars),
        source_url: original.to_string(),
        relevance_score: rec.get(Field::Relevance).and_then(parse_relevance),
    })
}

/// Tag every candidate block of `text`.
pub fn parse_records(text: &str, ctx: &ParseContext<'_>) -> Vec<RecordOutcome> {
    let known_urls: HashMap<String, &str> = ctx
        .batch_urls
        .iter()
        .map(|u| (url_key(u), *u))
        .collect();
    split_records(text)
        .iter()
        .map(|rec| judge(rec, &known_urls, ctx))
        .collect()
}

/// Parse one batch response into validated insights plus counters.
pub fn parse_response(text: &str, ctx: &ParseContext<'_>) -> BatchParse {
    let mut out = BatchParse::default();
    for outcome in parse_records(text, ctx) {
        match outcome {
            RecordOutcome::Valid(insight) => {
                out.parsed += 1;
                out.insights.push(insight);
            }
            RecordOutcome::Malformed { reason } => {
                tracing::debug!(%reason, "discarding malformed record");
                out.parse_failures += 1;
            }
            RecordOutcome::InvalidCitation { url } => {
                tracing::warn!(%url, "discarding record citing unknown url");
                out.parsed += 1;
                out.invalid_citations += 1;
            }
        }
    }
    out
}
