use crate::constants::TAG_CONFLICT_RETRIES;
use crate::error::StoreError;
use crate::models::{Tag, TagId};
use crate::slug;
use crate::store::Store;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolves tag names to tag records, reusing existing tags by slug
pub struct TagReconciler {
    store: Arc<dyn Store>,
}

impl TagReconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve every name to a tag id, creating tags that do not exist yet.
    ///
    /// Names that normalize to the same slug collapse to one id; names with
    /// an empty slug are skipped. Ids come back in first-seen order, each
    /// once.
    pub async fn resolve(&self, names: &[String]) -> Result<Vec<TagId>, StoreError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for name in names {
            let slug = slug::normalize(name);
            if slug.is_empty() {
                tracing::debug!(name = %name, "Skipping tag name without a usable slug");
                continue;
            }
            if !seen.insert(slug.clone()) {
                continue;
            }

            let tag = self.resolve_one(name, &slug).await?;
            ids.push(tag.id);
        }

        Ok(ids)
    }

    /// Find-or-create one tag. A uniqueness conflict on create means another
    /// writer got there first, so the tag is re-read instead of failing.
    async fn resolve_one(&self, name: &str, slug: &str) -> Result<Tag, StoreError> {
        for attempt in 1..=TAG_CONFLICT_RETRIES {
            if let Some(tag) = self.store.find_tag_by_slug(slug).await? {
                return Ok(tag);
            }

            match self.store.create_tag(name).await {
                Ok(tag) => {
                    tracing::debug!(slug, tag_id = %tag.id, "Created tag");
                    return Ok(tag);
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(slug, attempt, "Tag created concurrently, re-reading");
                    if let Some(tag) = self.store.find_tag_by_slug(slug).await? {
                        return Ok(tag);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(slug, "Tag kept conflicting but could not be read back");
        Err(StoreError::Conflict {
            slug: slug.to_string(),
        })
    }
}
