// src/render.rs
//! Digest → HTML email body + subject line.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::errors::RenderError;
use crate::summarize::types::{Digest, Insight};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
}

const STYLE: &str = "body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;color:#1f2328;max-width:720px;margin:0 auto;padding:16px}\
h1{font-size:22px;margin-bottom:4px}\
.meta{color:#59636e;font-size:13px;margin-top:0}\
.notice{background:#fff8c5;border:1px solid #d4a72c;padding:8px 12px;border-radius:6px;font-size:13px}\
h2{font-size:17px;border-bottom:1px solid #d1d9e0;padding-bottom:4px;margin-top:28px}\
.insight{margin:14px 0}\
.insight h3{font-size:15px;margin:0 0 4px}\
.insight p{margin:0 0 4px;line-height:1.45}\
.src{font-size:12px}\
.score{color:#59636e;font-size:12px}\
.empty{color:#59636e;font-style:italic}";

pub fn subject_line(digest: &Digest) -> String {
    format!(
        "Community digest for {}: {} insights",
        digest.meta.generated_at.format("%B %d, %Y"),
        digest.insight_count()
    )
}

/// Check the invariants the assembler guarantees.
fn check(digest: &Digest) -> Result<(), RenderError> {
    for g in &digest.groups {
        if g.insights.is_empty() {
            return Err(RenderError::EmptyGroup(g.category.clone()));
        }
        if let Some(bad) = g.insights.iter().find(|i| i.source_url.is_empty()) {
            return Err(RenderError::MissingSource {
                title: bad.title.clone(),
            });
        }
    }
    Ok(())
}

fn write_insight(out: &mut String, i: &Insight) -> Result<(), RenderError> {
    writeln!(out, r#"<div class="insight">"#)?;
    writeln!(out, "<h3>{}</h3>", encode_text(&i.title))?;
    writeln!(out, "<p>{}</p>", encode_text(&i.summary))?;
    write!(
        out,
        r#"<p class="src"><a href="{}">source</a>"#,
        encode_double_quoted_attribute(&i.source_url)
    )?;
    if let Some(score) = i.relevance_score {
        write!(out, r#" <span class="score">relevance {:.0}%</span>"#, score * 100.0)?;
    }
    writeln!(out, "</p>")?;
    writeln!(out, "</div>")?;
    Ok(())
}

/// Render the digest. An empty digest still yields a valid document.
pub fn render(digest: &Digest) -> Result<RenderedDigest, RenderError> {
    check(digest)?;
    let meta = &digest.meta;
    let mut out = String::with_capacity(4096);

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, r#"<html lang="en"><head><meta charset="utf-8">"#)?;
    writeln!(out, "<title>{}</title>", encode_text(&subject_line(digest)))?;
    writeln!(out, "<style>{STYLE}</style></head><body>")?;
    writeln!(
        out,
        "<h1>Community digest: {}</h1>",
        meta.generated_at.format("%B %d, %Y")
    )?;

    let communities = meta
        .communities
        .iter()
        .map(|c| format!("r/{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        out,
        r#"<p class="meta">{} posts considered from {} · {} insights · generated {}</p>"#,
        meta.posts_considered,
        encode_text(&communities),
        digest.insight_count(),
        meta.generated_at.format("%Y-%m-%d %H:%M UTC")
    )?;

    if meta.is_partial() {
        writeln!(
            out,
            r#"<p class="notice">Partial coverage: {} of {} batches could not be summarized.</p>"#,
            meta.failures.len(),
            meta.batches
        )?;
    }

    if digest.is_empty() {
        writeln!(out, r#"<p class="empty">No insights for this period.</p>"#)?;
    }

    for group in &digest.groups {
        writeln!(out, "<h2>{}</h2>", encode_text(&group.category))?;
        for insight in &group.insights {
            write_insight(&mut out, insight)?;
        }
    }

    writeln!(out, "</body></html>")?;

    Ok(RenderedDigest {
        subject: subject_line(digest),
        html: out,
    })
}
