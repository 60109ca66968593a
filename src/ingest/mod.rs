// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use std::time::Duration;

use metrics::counter;

use crate::errors::FetchError;
use crate::ingest::types::{FetchPlan, PostSource, RawPost};

/// Normalize forum text: trim, drop moderator tombstones, fold CRLF.
pub fn clean_text(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("[deleted]") || lower.contains("[removed]") {
        return String::new();
    }
    trimmed.replace("\r\n", "\n")
}

/// Fetch every community of the plan, in order.
///
/// A failing community is logged and skipped; the run only fails when no
/// community could be fetched at all. An empty (but successful) result is fine.
pub async fn fetch_all(
    source: &dyn PostSource,
    plan: &FetchPlan,
    delay_between: Duration,
) -> Result<Vec<RawPost>, FetchError> {
    crate::telemetry::ensure_metrics_described();

    if plan.communities.is_empty() {
        return Err(FetchError::NoCommunities);
    }

    let mut all = Vec::new();
    let mut last_err = None;
    let mut succeeded = 0usize;

    for (i, community) in plan.communities.iter().enumerate() {
        if i > 0 && !delay_between.is_zero() {
            tokio::time::sleep(delay_between).await;
        }
        match source.fetch_community(community, plan).await {
            Ok(mut posts) => {
                succeeded += 1;
                tracing::info!(
                    target: "ingest",
                    community = %community,
                    provider = source.name(),
                    posts = posts.len(),
                    "fetched community"
                );
                all.append(&mut posts);
            }
            Err(e) => {
                tracing::warn!(error = %e, community = %community, "community fetch failed");
                counter!("digest_fetch_errors_total").increment(1);
                last_err = Some(e);
            }
        }
    }

    if succeeded == 0 {
        if let Some(last) = last_err {
            return Err(FetchError::AllCommunitiesFailed {
                last: Box::new(last),
            });
        }
    }

    counter!("digest_posts_fetched_total").increment(all.len() as u64);
    Ok(all)
}
