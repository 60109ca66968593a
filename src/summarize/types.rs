// src/summarize/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::RawPost;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// A post as placed into a batch: fetch position + possibly truncated content.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedPost {
    /// Position in the fetched sequence.
    pub index: usize,
    pub post: RawPost,
    /// Content was cut to fit the batch budget.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryBatch {
    pub index: usize,
    pub posts: Vec<BatchedPost>,
}

impl SummaryBatch {
    pub fn first_post_index(&self) -> usize {
        self.posts.first().map(|p| p.index).unwrap_or(usize::MAX)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.posts.iter().map(|p| p.post.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub category: String,
    pub summary: String,
    pub source_url: String,
    pub relevance_score: Option<f32>,
}

/// Insights of one batch, tagged for re-joining into fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInsights {
    pub batch_index: usize,
    pub first_post_index: usize,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub communities: Vec<String>,
    pub posts_considered: usize,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
    /// Blocks discarded for missing fields.
    pub parse_failures: usize,
    /// Records citing a URL that was not in their batch.
    pub invalid_citations: usize,
    pub duplicates_removed: usize,
}

impl RunMetadata {
    /// Some batches produced nothing because their call failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub groups: Vec<CategoryGroup>,
    pub meta: RunMetadata,
}

impl Digest {
    pub fn insight_count(&self) -> usize {
        self.groups.iter().map(|g| g.insights.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.insight_count() == 0
    }

    /// Insights in digest order.
    pub fn insights(&self) -> impl Iterator<Item = &Insight> {
        self.groups.iter().flat_map(|g| g.insights.iter())
    }
}
