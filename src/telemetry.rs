// src/telemetry.rs
use std::path::Path;

use anyhow::Context;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest runs started.");
        describe_counter!("digest_posts_fetched_total", "Posts returned by the forum.");
        describe_counter!(
            "digest_fetch_errors_total",
            "Communities that could not be fetched."
        );
        describe_counter!("digest_batches_total", "Summarization batches planned.");
        describe_counter!(
            "digest_model_call_failures_total",
            "Batches that produced no insights because the model call failed."
        );
        describe_counter!(
            "digest_parse_failures_total",
            "Model records discarded for missing fields."
        );
        describe_counter!(
            "digest_citation_rejects_total",
            "Model records citing a URL outside their batch."
        );
        describe_counter!("digest_insights_total", "Insights delivered in digests.");
        describe_histogram!("digest_fetch_page_ms", "Listing page fetch time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Write the exposition for a node-exporter textfile collector.
    /// Temp file + rename, so a scrape never sees a partial file.
    pub fn write_textfile(&self, path: &Path) -> anyhow::Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.handle.render())
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }
}
