//! Related-tag analysis over the saved-search corpus.

use std::sync::Arc;

use crate::correlation::related_tags;
use crate::error::Result;
use crate::tags::{validate_tag_name, TagRelation};
use crate::traits::SavedSearchRepository;

#[derive(Clone)]
pub struct CorrelationService {
    searches: Arc<dyn SavedSearchRepository>,
}

impl CorrelationService {
    pub fn new(searches: Arc<dyn SavedSearchRepository>) -> Self {
        Self { searches }
    }

    /// Top related tags for `tag` by Jaccard similarity.
    pub async fn related_tags(&self, tag: &str) -> Result<Vec<TagRelation>> {
        let tag = validate_tag_name(tag)?;
        let corpus = self.searches.list().await?;
        Ok(related_tags(corpus.iter().map(|s| &s.tags), &tag))
    }
}

#[cfg(test)]
mod tests {
    use crate::services::test_support::fixture;

    #[tokio::test]
    async fn test_related_from_saved_searches() {
        let f = fixture().await;
        let u = f.admin.id;
        f.store.add_saved_search(u, "q1", &["A", "B"]).await;
        f.store.add_saved_search(u, "q2", &["A", "C"]).await;
        f.store.add_saved_search(u, "q3", &["B", "C"]).await;

        let related = f.governance.correlation.related_tags("A").await.unwrap();
        let tags: Vec<&str> = related.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["B", "C"]);
        assert!((related[0].correlation - 1.0 / 3.0).abs() < 1e-12);

        assert!(f
            .governance
            .correlation
            .related_tags("Z")
            .await
            .unwrap()
            .is_empty());
    }
}
