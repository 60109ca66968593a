// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::errors::FetchError;

/// One forum post as handed to the summarizer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct RawPost {
    pub source_community: String, // e.g. "rust" (without the r/ prefix)
    pub title: String,
    pub body: String, // empty for link posts
    pub url: String,  // absolute permalink
    pub score: u64,
    pub num_comments: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub top_comments: Vec<String>,
}

/// Listing order requested from the forum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeFilter::Hour),
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            other => anyhow::bail!("unsupported time filter: {other}"),
        }
    }
}

/// What a fetcher needs to know about one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub communities: Vec<String>,
    pub time_filter: TimeFilter,
    pub posts_per_community: usize,
    pub comments_per_post: usize,
}

#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Top posts of one community, in listing order.
    async fn fetch_community(
        &self,
        community: &str,
        plan: &FetchPlan,
    ) -> Result<Vec<RawPost>, FetchError>;
    fn name(&self) -> &'static str;
}
