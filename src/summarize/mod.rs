// src/summarize/mod.rs
//! Summarization core: batch → prompt → model call → parse → assemble.
//!
//! The summarizer gets its limits as explicit `SummarizerParams` and never
//! reads configuration on its own. A failed batch contributes nothing and is
//! recorded in the digest metadata; it never stops the other batches.

pub mod assemble;
pub mod batch;
pub mod parse;
pub mod prompt;
pub mod types;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use tokio::sync::Semaphore;

use crate::ai_adapter::{DynAiClient, ModelParams};
use crate::errors::ModelCallError;
use crate::ingest::types::RawPost;
use crate::summarize::parse::{parse_response, BatchParse, ParseContext};
use crate::summarize::types::{
    BatchFailure, BatchInsights, Digest, RunMetadata, SummaryBatch,
};

// Re-export convenient types.
pub use crate::summarize::types::{CategoryGroup, Insight};

/// Limits the orchestrator hands to the summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizerParams {
    pub max_batch_chars: usize,
    pub max_posts_per_batch: usize,
    pub summary_max_chars: usize,
}

impl Default for SummarizerParams {
    fn default() -> Self {
        Self {
            max_batch_chars: 12_000,
            max_posts_per_batch: 10,
            summary_max_chars: 500,
        }
    }
}

/// Run facts the summarizer copies into the digest metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestHeader {
    pub generated_at: DateTime<Utc>,
    pub communities: Vec<String>,
}

struct BatchOutcome {
    batch_index: usize,
    first_post_index: usize,
    result: Result<BatchParse, ModelCallError>,
}

pub struct Summarizer {
    client: DynAiClient,
    model: ModelParams,
    categories: Vec<String>,
    concurrency: usize,
    call_timeout: Duration,
}

impl Summarizer {
    pub fn new(client: DynAiClient, model: ModelParams) -> Self {
        Self {
            client,
            model,
            categories: Vec::new(),
            concurrency: 2,
            call_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Summarize all posts into a digest. Zero posts means zero model calls.
    pub async fn summarize(
        &self,
        posts: Vec<RawPost>,
        params: SummarizerParams,
        header: DigestHeader,
    ) -> Digest {
        crate::telemetry::ensure_metrics_described();

        let posts_considered = posts.len();
        let batches = batch::plan_batches(posts, &params);
        counter!("digest_batches_total").increment(batches.len() as u64);
        tracing::info!(
            posts = posts_considered,
            batches = batches.len(),
            provider = self.client.provider_name(),
            "summarizing"
        );

        let permits = Semaphore::new(self.concurrency);
        let outcomes = join_all(
            batches
                .iter()
                .map(|b| self.run_batch(b, &params, &permits)),
        )
        .await;

        let mut meta = RunMetadata {
            generated_at: header.generated_at,
            communities: header.communities,
            posts_considered,
            batches: batches.len(),
            ..RunMetadata::default()
        };
        let mut per_batch = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            match outcome.result {
                Ok(parsed) => {
                    meta.parse_failures += parsed.parse_failures;
                    meta.invalid_citations += parsed.invalid_citations;
                    if parsed.parsed == 0 {
                        tracing::warn!(
                            batch = outcome.batch_index,
                            "model response had no parseable records"
                        );
                        counter!("digest_model_call_failures_total").increment(1);
                        meta.failures.push(BatchFailure {
                            batch_index: outcome.batch_index,
                            reason: ModelCallError::NoRecords.to_string(),
                        });
                    }
                    per_batch.push(BatchInsights {
                        batch_index: outcome.batch_index,
                        first_post_index: outcome.first_post_index,
                        insights: parsed.insights,
                    });
                }
                Err(e) => {
                    tracing::warn!(batch = outcome.batch_index, error = %e, "model call failed");
                    counter!("digest_model_call_failures_total").increment(1);
                    meta.failures.push(BatchFailure {
                        batch_index: outcome.batch_index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        meta.failures.sort_by_key(|f| f.batch_index);

        let (groups, duplicates) = assemble::assemble(per_batch);
        meta.duplicates_removed = duplicates;

        let digest = Digest { groups, meta };
        counter!("digest_parse_failures_total").increment(digest.meta.parse_failures as u64);
        counter!("digest_citation_rejects_total").increment(digest.meta.invalid_citations as u64);
        counter!("digest_insights_total").increment(digest.insight_count() as u64);

        if digest.meta.batches > 0 && digest.meta.failures.len() == digest.meta.batches {
            tracing::error!(batches = digest.meta.batches, "every batch failed");
        }
        digest
    }

    async fn run_batch(
        &self,
        batch: &SummaryBatch,
        params: &SummarizerParams,
        permits: &Semaphore,
    ) -> BatchOutcome {
        // the semaphore is never closed, so acquiring cannot fail
        let _permit = permits.acquire().await.ok();

        let request = prompt::build_request(batch, &self.categories, &self.model);
        let t0 = std::time::Instant::now();
        let call = tokio::time::timeout(self.call_timeout, self.client.complete(&request)).await;

        let result = match call {
            Err(_) => Err(ModelCallError::Timeout(self.call_timeout)),
            Ok(Err(e)) => Err(e),
            Ok(Ok(text)) if text.trim().is_empty() => Err(ModelCallError::EmptyResponse),
            Ok(Ok(text)) => {
                let ctx = ParseContext {
                    batch_urls: batch.urls().collect(),
                    categories: &self.categories,
                    summary_max_chars: params.summary_max_chars,
                };
                Ok(parse_response(&text, &ctx))
            }
        };

        tracing::debug!(
            batch = batch.index,
            posts = batch.posts.len(),
            ms = t0.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "batch call finished"
        );

        BatchOutcome {
            batch_index: batch.index,
            first_post_index: batch.first_post_index(),
            result,
        }
    }
}
