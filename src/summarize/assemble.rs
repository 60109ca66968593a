// src/summarize/assemble.rs
use std::collections::HashSet;

use crate::summarize::parse::collapse_whitespace;
use crate::summarize::types::{BatchInsights, CategoryGroup, Insight};

/// Title form used for duplicate detection.
pub fn normalize_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

/// Re-join per-batch results into fetch order, regardless of completion order.
/// Stable: ties keep the order of appearance inside a response.
pub fn order_insights(mut per_batch: Vec<BatchInsights>) -> Vec<Insight> {
    per_batch.sort_by_key(|b| (b.first_post_index, b.batch_index));
    per_batch.into_iter().flat_map(|b| b.insights).collect()
}

/// Drop repeats of the same (source_url, normalized title), keeping the first.
/// Returns the kept insights and the number removed.
pub fn dedup_insights(insights: Vec<Insight>) -> (Vec<Insight>, usize) {
    let mut seen = HashSet::new();
    let mut removed = 0usize;
    let mut kept = Vec::with_capacity(insights.len());
    for i in insights {
        if seen.insert((i.source_url.clone(), normalize_title(&i.title))) {
            kept.push(i);
        } else {
            removed += 1;
        }
    }
    (kept, removed)
}

/// Group by category. Group order follows first occurrence; the first-seen
/// spelling names the group and later case variants join it.
pub fn group_by_category(insights: Vec<Insight>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for i in insights {
        let key = i.category.to_lowercase();
        match groups
            .iter_mut()
            .find(|g| g.category.to_lowercase() == key)
        {
            Some(g) => g.insights.push(i),
            None => groups.push(CategoryGroup {
                category: i.category.clone(),
                insights: vec![i],
            }),
        }
    }
    groups
}

/// Order, dedup and group. Returns the groups and the duplicate count.
pub fn assemble(per_batch: Vec<BatchInsights>) -> (Vec<CategoryGroup>, usize) {
    let ordered = order_insights(per_batch);
    let (kept, removed) = dedup_insights(ordered);
    (group_by_category(kept), removed)
}
