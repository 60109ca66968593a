// src/pipeline.rs
//! Orchestrator: fetch → summarize → render → send, once per invocation.
//!
//! A run ends in one of three ways:
//! - `Err(RunError)`: aborted before any email (nothing fetched, or a broken digest),
//! - `RunOutcome::Delivered`: the digest went out, possibly with partial coverage,
//! - `RunOutcome::SendFailed`: delivery failed; the HTML was kept on disk.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;

use crate::ai_adapter::{build_client_from_config, DynAiClient};
use crate::config::AppConfig;
use crate::errors::{RunError, SendError};
use crate::ingest::providers::reddit::RedditProvider;
use crate::ingest::types::{FetchPlan, PostSource};
use crate::notify::{FileMailer, Mailer, SmtpMailer};
use crate::render::{render, RenderedDigest};
use crate::summarize::types::Digest;
use crate::summarize::{DigestHeader, Summarizer};

#[derive(Debug)]
pub struct RunReport {
    pub digest: Digest,
    pub rendered: RenderedDigest,
}

#[derive(Debug)]
pub enum RunOutcome {
    Delivered(RunReport),
    SendFailed {
        report: RunReport,
        error: SendError,
        /// Where the undeliverable HTML was written, if that worked.
        preserved_at: Option<PathBuf>,
    },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Delivered(r) => r,
            RunOutcome::SendFailed { report, .. } => report,
        }
    }
}

pub struct Orchestrator {
    config: AppConfig,
    source: Box<dyn PostSource>,
    client: DynAiClient,
    mailer: Box<dyn Mailer>,
    fallback: FileMailer,
}

impl Orchestrator {
    /// Wire explicit components (tests, alternative transports).
    pub fn new(
        config: AppConfig,
        source: Box<dyn PostSource>,
        client: DynAiClient,
        mailer: Box<dyn Mailer>,
    ) -> Self {
        let fallback = FileMailer::new(config.output_dir.clone());
        Self {
            config,
            source,
            client,
            mailer,
            fallback,
        }
    }

    /// Wire the production components described by `config`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let source = RedditProvider::from_url(
            &config.fetch.base_url,
            Duration::from_secs(config.fetch.timeout_secs),
        )?;
        let client = build_client_from_config(&config.llm)?;
        let mailer: Box<dyn Mailer> = if config.dry_run {
            Box::new(FileMailer::new(config.output_dir.clone()))
        } else {
            Box::new(SmtpMailer::from_config(&config.smtp)?)
        };
        tracing::info!(
            provider = client.provider_name(),
            model = %config.llm.model,
            key_len = config.llm.api_key.len(),
            mailer = mailer.name(),
            "pipeline wired"
        );
        Ok(Self::new(config, Box::new(source), client, mailer))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        crate::telemetry::ensure_metrics_described();
        counter!("digest_runs_total").increment(1);
        let cfg = &self.config;

        // 1) Fetch (fatal on failure)
        let plan = FetchPlan {
            communities: cfg.fetch.communities.clone(),
            time_filter: cfg.fetch.time_filter,
            posts_per_community: cfg.fetch.posts_per_community,
            comments_per_post: cfg.fetch.comments_per_post,
        };
        tracing::info!(
            communities = ?plan.communities,
            time_filter = %plan.time_filter,
            "fetching posts"
        );
        let posts = crate::ingest::fetch_all(
            self.source.as_ref(),
            &plan,
            Duration::from_millis(cfg.fetch.request_delay_ms),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "fetch failed, aborting run");
            e
        })?;

        // 2) Summarize (per-batch failures land in the metadata)
        let summarizer = Summarizer::new(self.client.clone(), cfg.llm.model_params())
            .with_categories(cfg.categories.clone())
            .with_concurrency(cfg.llm.concurrency)
            .with_call_timeout(Duration::from_secs(cfg.llm.timeout_secs));
        let header = DigestHeader {
            generated_at: Utc::now(),
            communities: cfg.fetch.communities.clone(),
        };
        let digest = summarizer.summarize(posts, cfg.summarizer, header).await;
        tracing::info!(
            insights = digest.insight_count(),
            failures = digest.meta.failures.len(),
            parse_failures = digest.meta.parse_failures,
            invalid_citations = digest.meta.invalid_citations,
            "digest assembled"
        );

        // 3) Render
        let rendered = render(&digest)?;

        // 4) Send (never crashes; keeps the HTML when it fails)
        let send = tokio::time::timeout(
            Duration::from_secs(cfg.smtp.timeout_secs),
            self.mailer.send(&rendered),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SendError::Transport(format!(
                "timed out after {}s",
                cfg.smtp.timeout_secs
            )))
        });

        let report = RunReport { digest, rendered };
        match send {
            Ok(()) => Ok(RunOutcome::Delivered(report)),
            Err(error) => {
                let preserved_at = match self.fallback.write(&report.rendered) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::error!(error = %e, "could not preserve digest on disk");
                        None
                    }
                };
                tracing::error!(
                    error = %error,
                    preserved_at = ?preserved_at,
                    "digest delivery failed"
                );
                Ok(RunOutcome::SendFailed {
                    report,
                    error,
                    preserved_at,
                })
            }
        }
    }
}
