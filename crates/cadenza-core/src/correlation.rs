//! Tag correlation analysis over saved searches.
//!
//! Relatedness is the Jaccard similarity of the two tags' occurrence sets:
//!
//! ```text
//! correlation(t) = co(t) / (count(target) + count(t) - co(t))
//! ```
//!
//! where `co(t)` is the number of searches containing both tags. Each search
//! contributes its tags as a set, so a tag repeated within one search counts
//! once.

use std::collections::{BTreeMap, BTreeSet};

use crate::tags::TagRelation;

/// Number of related tags returned by [`related_tags`].
pub const DEFAULT_RELATED_LIMIT: usize = 5;

/// Top related tags for `target`, at most [`DEFAULT_RELATED_LIMIT`].
pub fn related_tags<'a, I, S>(searches: I, target: &str) -> Vec<TagRelation>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<[String]> + 'a + ?Sized,
{
    related_tags_with_limit(searches, target, DEFAULT_RELATED_LIMIT)
}

/// Related tags for `target`, ordered by descending correlation with ties
/// broken by tag name ascending, truncated to `limit`.
///
/// Returns an empty list when the target never occurs.
pub fn related_tags_with_limit<'a, I, S>(
    searches: I,
    target: &str,
    limit: usize,
) -> Vec<TagRelation>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<[String]> + 'a + ?Sized,
{
    let mut tag_counts: BTreeMap<&str, u32> = BTreeMap::new();
    let mut cooccurrences: BTreeMap<&str, u32> = BTreeMap::new();
    let mut target_count: u32 = 0;

    for search in searches {
        let tags: BTreeSet<&str> = search.as_ref().iter().map(String::as_str).collect();

        for tag in &tags {
            *tag_counts.entry(*tag).or_insert(0) += 1;
        }

        if tags.contains(target) {
            target_count += 1;
            for tag in tags.iter().filter(|t| **t != target) {
                *cooccurrences.entry(*tag).or_insert(0) += 1;
            }
        }
    }

    let mut relations: Vec<TagRelation> = cooccurrences
        .into_iter()
        .map(|(tag, co)| {
            let tag_count = tag_counts.get(tag).copied().unwrap_or(0);
            TagRelation {
                tag: tag.to_string(),
                cooccurrences: co,
                correlation: jaccard(co, target_count, tag_count),
            }
        })
        .collect();

    relations.sort_by(|a, b| {
        b.correlation
            .total_cmp(&a.correlation)
            .then_with(|| a.tag.cmp(&b.tag))
    });
    relations.truncate(limit);

    tracing::trace!(
        subsystem = "core",
        component = "correlation",
        tag = target,
        target_count,
        result_count = relations.len(),
        "Computed tag correlations"
    );

    relations
}

/// Jaccard similarity from intersection and the two set sizes.
fn jaccard(intersection: u32, a: u32, b: u32) -> f64 {
    let union = a + b - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
