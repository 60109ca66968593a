// src/config/mod.rs
//! Run configuration.
//!
//! Everything is read once, through a key lookup, into an explicit `AppConfig`
//! that the binary hands to the pipeline. Nothing below `pipeline` reads the
//! process environment.

pub mod ai;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::config::ai::LlmConfig;
use crate::ingest::config::{load_communities_default, parse_community_csv, ENV_PATH};
use crate::ingest::types::TimeFilter;
use crate::summarize::SummarizerParams;

pub const DEFAULT_COMMUNITIES: &str = "python,technology,programming";

/// Fetch-side settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub communities: Vec<String>,
    pub time_filter: TimeFilter,
    pub posts_per_community: usize,
    pub comments_per_post: usize,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub summarizer: SummarizerParams,
    /// Optional fixed taxonomy offered to the model.
    pub categories: Vec<String>,
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    /// Where dry-run output and undeliverable digests are written.
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub metrics_textfile: Option<PathBuf>,
}

impl AppConfig {
    /// Load from the process environment (after `dotenvy` ran in the binary).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let communities = match get("SUBREDDITS") {
            Some(csv) => parse_community_csv(&csv),
            None => match load_communities_default(get(ENV_PATH).as_deref())? {
                Some(list) => list,
                None => parse_community_csv(DEFAULT_COMMUNITIES),
            },
        };
        if communities.is_empty() {
            bail!("no communities configured (SUBREDDITS is empty)");
        }

        let time_filter = match get("TIME_FILTER") {
            Some(v) => TimeFilter::from_str(&v).context("TIME_FILTER")?,
            None => TimeFilter::Day,
        };

        let fetch = FetchConfig {
            communities,
            time_filter,
            posts_per_community: parse_or(&get, "POSTS_PER_SUBREDDIT", 10)?,
            comments_per_post: parse_or(&get, "COMMENTS_PER_POST", 5)?,
            request_delay_ms: parse_or(&get, "REQUEST_DELAY_MS", 1_000)?,
            timeout_secs: parse_or(&get, "FETCH_TIMEOUT_SECS", 10)?,
            base_url: get("REDDIT_BASE_URL")
                .unwrap_or_else(|| crate::ingest::providers::reddit::DEFAULT_BASE_URL.to_string()),
        };

        let summarizer = SummarizerParams {
            max_batch_chars: parse_or(&get, "MAX_BATCH_CHARS", 12_000)?,
            max_posts_per_batch: parse_or(&get, "MAX_POSTS_PER_BATCH", 10)?,
            summary_max_chars: parse_or(&get, "SUMMARY_MAX_CHARS", 500)?,
        };

        let categories = get("DIGEST_CATEGORIES")
            .map(|csv| {
                csv.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let defaults = LlmConfig::default();
        let mut llm = LlmConfig {
            base_url: get("LLM_BASE_URL").unwrap_or(defaults.base_url),
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            api_key: get("LLM_API_KEY")
                .or_else(|| get("TOGETHER_API_KEY"))
                .unwrap_or_default(),
            max_tokens: parse_or(&get, "LLM_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_or(&get, "LLM_TEMPERATURE", defaults.temperature)?,
            timeout_secs: parse_or(&get, "LLM_TIMEOUT_SECS", defaults.timeout_secs)?,
            concurrency: parse_or(&get, "LLM_CONCURRENCY", defaults.concurrency)?,
            test_mode: get("LLM_TEST_MODE"),
        };
        llm.sanitize();

        let dry_run = get("DIGEST_DRY_RUN").is_some_and(|v| is_truthy(&v));

        let smtp = SmtpConfig {
            server: get("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parse_or(&get, "SMTP_PORT", 465)?,
            sender: get("SENDER_EMAIL").unwrap_or_default(),
            password: get("SENDER_PASSWORD").unwrap_or_default(),
            recipients: get("RECIPIENT_EMAILS")
                .map(|csv| {
                    csv.split(',')
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            timeout_secs: parse_or(&get, "SMTP_TIMEOUT_SECS", 30)?,
        };

        let cfg = AppConfig {
            fetch,
            summarizer,
            categories,
            llm,
            smtp,
            output_dir: get("DIGEST_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("out")),
            dry_run,
            metrics_textfile: get("METRICS_TEXTFILE_PATH").map(PathBuf::from),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.posts_per_community == 0 {
            bail!("POSTS_PER_SUBREDDIT must be at least 1");
        }
        if self.summarizer.max_batch_chars == 0 {
            bail!("MAX_BATCH_CHARS must be at least 1");
        }
        if self.summarizer.max_posts_per_batch == 0 {
            bail!("MAX_POSTS_PER_BATCH must be at least 1");
        }
        if self.summarizer.summary_max_chars < 2 {
            bail!("SUMMARY_MAX_CHARS must be at least 2");
        }
        if self.llm.api_key.is_empty() && !self.llm.is_mock() {
            bail!("LLM_API_KEY (or TOGETHER_API_KEY) environment variable is required");
        }
        if !self.dry_run {
            if self.smtp.sender.is_empty() {
                bail!("SENDER_EMAIL environment variable is required");
            }
            if self.smtp.password.is_empty() {
                bail!("SENDER_PASSWORD environment variable is required");
            }
            if self.smtp.recipients.is_empty() {
                bail!("RECIPIENT_EMAILS environment variable is required");
            }
        }
        Ok(())
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("TOGETHER_API_KEY", "key"),
        ("SENDER_EMAIL", "bot@example.com"),
        ("SENDER_PASSWORD", "pw"),
        ("RECIPIENT_EMAILS", "a@example.com, b@example.com"),
    ];

    #[test]
    fn defaults_apply() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUBREDDITS", "rust, golang"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.fetch.communities, vec!["rust", "golang"]);
        assert_eq!(cfg.fetch.time_filter, TimeFilter::Day);
        assert_eq!(cfg.fetch.posts_per_community, 10);
        assert_eq!(cfg.summarizer.summary_max_chars, 500);
        assert_eq!(cfg.smtp.port, 465);
        assert_eq!(cfg.smtp.recipients.len(), 2);
        assert_eq!(cfg.llm.api_key, "key");
        assert!(!cfg.dry_run);
    }

    #[test]
    fn missing_secret_is_reported() {
        let pairs = vec![("SUBREDDITS", "rust"), ("TOGETHER_API_KEY", "key")];
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("SENDER_EMAIL"), "{err}");
    }

    #[test]
    fn dry_run_with_mock_needs_no_secrets() {
        let pairs = vec![
            ("SUBREDDITS", "rust"),
            ("LLM_TEST_MODE", "mock"),
            ("DIGEST_DRY_RUN", "true"),
        ];
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!(cfg.dry_run);
        assert!(cfg.llm.is_mock());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUBREDDITS", "rust"));
        pairs.push(("TIME_FILTER", "decade"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUBREDDITS", "rust"));
        pairs.push(("MAX_POSTS_PER_BATCH", "0"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUBREDDITS", "rust"));
        pairs.push(("SMTP_PORT", "not-a-port"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn categories_are_split() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUBREDDITS", "rust"));
        pairs.push(("DIGEST_CATEGORIES", "Tooling, Hiring ,,Release"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.categories, vec!["Tooling", "Hiring", "Release"]);
    }
}
