// src/ingest/providers/reddit.rs
//! Reddit public JSON API (`/r/{name}/top.json`) provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::histogram;
use serde::Deserialize;

use crate::errors::FetchError;
use crate::ingest::clean_text;
use crate::ingest::types::{FetchPlan, PostSource, RawPost};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const PERMALINK_HOST: &str = "https://www.reddit.com";
const MAX_PAGE_SIZE: usize = 100;
const USER_AGENT: &str = "subreddit-digest/0.1 (scheduled digest job)";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    created_utc: f64,
}

fn unix_to_utc(secs: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs.max(0.0) as i64, 0)
        .single()
        .unwrap_or_default()
}

fn permalink_url(permalink: &str) -> String {
    if permalink.starts_with("http") {
        permalink.to_string()
    } else {
        format!("{PERMALINK_HOST}{permalink}")
    }
}

/// Parse one listing page. Returns the posts and the `after` cursor.
pub fn parse_listing(
    community: &str,
    body: &str,
) -> Result<(Vec<RawPost>, Option<String>), FetchError> {
    let listing: Listing = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        community: community.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for thing in listing.data.children {
        if thing.kind != "t3" {
            continue;
        }
        let Ok(p) = serde_json::from_value::<PostData>(thing.data) else {
            tracing::debug!(community, "skipping undecodable post");
            continue;
        };
        if p.permalink.is_empty() {
            continue;
        }
        out.push(RawPost {
            source_community: community.to_string(),
            title: p.title.trim().to_string(),
            body: clean_text(&p.selftext),
            url: permalink_url(&p.permalink),
            score: p.score.max(0) as u64,
            num_comments: p.num_comments.max(0) as u64,
            created_at: unix_to_utc(p.created_utc),
            top_comments: Vec::new(),
        });
    }
    Ok((out, listing.data.after.filter(|a| !a.is_empty())))
}

/// Walk a post's comment tree depth-first, keeping at most `max` non-empty bodies.
pub fn parse_comments(body: &str, max: usize) -> Vec<String> {
    let Ok(listings) = serde_json::from_str::<Vec<Listing>>(body) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if let Some(comments) = listings.get(1) {
        collect_comments(&comments.data.children, max, &mut out);
    }
    out
}

fn collect_comments(children: &[Thing], max: usize, out: &mut Vec<String>) {
    for thing in children {
        if out.len() >= max {
            return;
        }
        if thing.kind != "t1" {
            continue;
        }
        let text = thing
            .data
            .get("body")
            .and_then(|b| b.as_str())
            .map(clean_text)
            .unwrap_or_default();
        if !text.is_empty() {
            out.push(text);
        }
        // `replies` is "" when empty, otherwise a nested listing
        if let Some(replies) = thing.data.get("replies").filter(|r| r.is_object()) {
            if let Ok(nested) = serde_json::from_value::<Listing>(replies.clone()) {
                collect_comments(&nested.data.children, max, out);
            }
        }
    }
}

pub struct RedditProvider {
    mode: Mode,
}

enum Mode {
    /// Serves the same listing body for every community; no pagination, no comments.
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl RedditProvider {
    pub fn from_fixture_str(listing: &str) -> Self {
        Self {
            mode: Mode::Fixture(listing.to_string()),
        }
    }

    pub fn from_url(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        })
    }

    async fn get_text(
        client: &reqwest::Client,
        community: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let resp = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                community: community.to_string(),
                reason: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                community: community.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|e| FetchError::Http {
            community: community.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_top(
        client: &reqwest::Client,
        base_url: &str,
        community: &str,
        plan: &FetchPlan,
    ) -> Result<Vec<RawPost>, FetchError> {
        let url = format!("{base_url}/r/{community}/top.json");
        let limit = plan.posts_per_community;
        let mut all: Vec<RawPost> = Vec::new();
        let mut after: Option<String> = None;

        while all.len() < limit {
            let page_size = MAX_PAGE_SIZE.min(limit - all.len());
            let mut query = vec![
                ("limit", page_size.to_string()),
                ("raw_json", "1".to_string()),
                ("t", plan.time_filter.to_string()),
            ];
            if let Some(a) = &after {
                query.push(("after", a.clone()));
            }

            let t0 = std::time::Instant::now();
            let body = Self::get_text(client, community, &url, &query).await?;
            let (mut posts, next) = parse_listing(community, &body)?;
            histogram!("digest_fetch_page_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            if posts.is_empty() {
                break;
            }
            posts.truncate(limit - all.len());
            all.append(&mut posts);

            match next {
                Some(n) => after = Some(n),
                None => break,
            }
        }
        Ok(all)
    }

    async fn fetch_comments(
        client: &reqwest::Client,
        base_url: &str,
        post: &RawPost,
        max: usize,
    ) -> Vec<String> {
        let path = post
            .url
            .strip_prefix(PERMALINK_HOST)
            .unwrap_or(post.url.as_str())
            .trim_end_matches('/');
        let url = format!("{base_url}{path}.json");
        let query = [
            ("limit", max.to_string()),
            ("raw_json", "1".to_string()),
        ];
        match Self::get_text(client, &post.source_community, &url, &query).await {
            Ok(body) => parse_comments(&body, max),
            Err(e) => {
                tracing::warn!(error = %e, url = %post.url, "comment fetch failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl PostSource for RedditProvider {
    async fn fetch_community(
        &self,
        community: &str,
        plan: &FetchPlan,
    ) -> Result<Vec<RawPost>, FetchError> {
        match &self.mode {
            Mode::Fixture(body) => {
                let (mut posts, _) = parse_listing(community, body)?;
                posts.truncate(plan.posts_per_community);
                Ok(posts)
            }
            Mode::Http { base_url, client } => {
                let mut posts = Self::fetch_top(client, base_url, community, plan).await?;
                if plan.comments_per_post > 0 {
                    for post in posts.iter_mut() {
                        post.top_comments =
                            Self::fetch_comments(client, base_url, post, plan.comments_per_post)
                                .await;
                    }
                }
                Ok(posts)
            }
        }
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
