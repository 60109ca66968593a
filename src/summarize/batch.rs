// src/summarize/batch.rs
//! Greedy partitioning of fetched posts into bounded model requests.
//!
//! A post's size is the character count of its title, body and retained
//! comments. Posts are never split: an oversized post loses comments from the
//! end first, then body text, until it fits exactly, and is flagged.

use crate::ingest::types::RawPost;
use crate::summarize::types::{BatchedPost, SummaryBatch};
use crate::summarize::SummarizerParams;

pub fn post_size(post: &RawPost) -> usize {
    post.title.chars().count()
        + post.body.chars().count()
        + post
            .top_comments
            .iter()
            .map(|c| c.chars().count())
            .sum::<usize>()
}

/// Shrink a post to `max_chars`. Returns the post and whether anything was cut.
pub fn fit_post(post: RawPost, max_chars: usize) -> (RawPost, bool) {
    if post_size(&post) <= max_chars {
        return (post, false);
    }
    let mut p = post;
    while !p.top_comments.is_empty() && post_size(&p) > max_chars {
        p.top_comments.pop();
    }
    if post_size(&p) > max_chars {
        // title is kept whole even if it alone exceeds the budget
        let room = max_chars.saturating_sub(p.title.chars().count());
        p.body = p.body.chars().take(room).collect();
    }
    (p, true)
}

/// Partition `posts` in fetch order. Zero posts yield zero batches.
pub fn plan_batches(posts: Vec<RawPost>, params: &SummarizerParams) -> Vec<SummaryBatch> {
    let max_posts = params.max_posts_per_batch.max(1);
    let max_chars = params.max_batch_chars;

    let mut batches = Vec::new();
    let mut current: Vec<BatchedPost> = Vec::new();
    let mut current_chars = 0usize;

    for (index, post) in posts.into_iter().enumerate() {
        let (post, truncated) = fit_post(post, max_chars);
        let size = post_size(&post);

        let over_count = current.len() + 1 > max_posts;
        let over_chars = current_chars + size > max_chars;
        if !current.is_empty() && (over_count || over_chars) {
            batches.push(SummaryBatch {
                index: batches.len(),
                posts: std::mem::take(&mut current),
            });
            current_chars = 0;
        }

        if truncated {
            tracing::debug!(index, url = %post.url, "post truncated to fit batch budget");
        }
        current_chars += size;
        current.push(BatchedPost {
            index,
            post,
            truncated,
        });
    }

    if !current.is_empty() {
        batches.push(SummaryBatch {
            index: batches.len(),
            posts: current,
        });
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(title: &str, body: &str) -> RawPost {
        RawPost {
            source_community: "rust".into(),
            title: title.into(),
            body: body.into(),
            url: format!("https://www.reddit.com/r/rust/{title}"),
            score: 1,
            num_comments: 0,
            created_at: Utc::now(),
            top_comments: vec![],
        }
    }

    fn params(max_batch_chars: usize, max_posts_per_batch: usize) -> SummarizerParams {
        SummarizerParams {
            max_batch_chars,
            max_posts_per_batch,
            summary_max_chars: 500,
        }
    }

    #[test]
    fn zero_posts_zero_batches() {
        assert!(plan_batches(vec![], &params(100, 3)).is_empty());
    }

    #[test]
    fn union_preserves_order_and_limits() {
        let posts: Vec<RawPost> = (0..11)
            .map(|i| post(&format!("t{i}"), &"b".repeat(i * 7)))
            .collect();
        let expected: Vec<String> = posts.iter().map(|p| p.url.clone()).collect();
        let p = params(60, 3);

        let batches = plan_batches(posts, &p);
        let flattened: Vec<String> = batches
            .iter()
            .flat_map(|b| b.posts.iter().map(|bp| bp.post.url.clone()))
            .collect();
        assert_eq!(flattened, expected);

        for (i, b) in batches.iter().enumerate() {
            assert_eq!(b.index, i);
            assert!(!b.posts.is_empty());
            assert!(b.posts.len() <= 3);
            let chars: usize = b.posts.iter().map(|bp| post_size(&bp.post)).sum();
            assert!(chars <= 60, "batch {i} has {chars} chars");
        }
        let indices: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.posts.iter().map(|bp| bp.index))
            .collect();
        assert_eq!(indices, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn count_limit_closes_batches() {
        let posts = (0..5).map(|i| post(&format!("p{i}"), "")).collect();
        let batches = plan_batches(posts, &params(10_000, 2));
        let sizes: Vec<usize> = batches.iter().map(|b| b.posts.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2].first_post_index(), 4);
    }

    #[test]
    fn oversized_post_is_truncated_exactly_and_kept() {
        let posts = vec![post("a", "x"), post("big", &"é".repeat(500)), post("c", "y")];
        let batches = plan_batches(posts, &params(100, 10));
        assert_eq!(batches.len(), 3);
        let big = &batches[1].posts[0];
        assert!(big.truncated);
        assert_eq!(big.post.title, "big");
        assert_eq!(post_size(&big.post), 100);
        assert_eq!(big.post.body.chars().count(), 97);
        assert!(!batches[0].posts[0].truncated);
    }

    #[test]
    fn comments_go_before_body() {
        let mut p = post("t", "body");
        p.top_comments = vec!["c".repeat(10), "d".repeat(10)];
        let (fitted, truncated) = fit_post(p, 16);
        assert!(truncated);
        assert_eq!(fitted.body, "body");
        assert_eq!(fitted.top_comments.len(), 1);
    }

    #[test]
    fn long_title_survives_with_empty_body() {
        let (fitted, truncated) = fit_post(post(&"t".repeat(30), "body"), 10);
        assert!(truncated);
        assert_eq!(fitted.title.len(), 30);
        assert!(fitted.body.is_empty());
    }
}
