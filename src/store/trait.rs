use crate::error::StoreError;
use crate::models::{
    Asset, AssetEvent, AssetFilter, AssetId, AssetPatch, NewAsset, Tag, WriteOrigin,
};
use tokio::sync::broadcast;

/// Document store holding assets and tags.
///
/// Every call is atomic on its own; nothing is transactional across calls.
/// Tag slugs are unique: `create_tag` derives the slug from the name and
/// fails with [`StoreError::Conflict`] when it is already taken.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Look up a tag by its slug
    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError>;

    /// All tags, ordered by slug
    async fn find_tags(&self) -> Result<Vec<Tag>, StoreError>;

    /// Create a tag named `name`; the slug is derived at write time
    async fn create_tag(&self, name: &str) -> Result<Tag, StoreError>;

    /// Create an asset and emit a `Create` event
    async fn create_asset(&self, asset: NewAsset) -> Result<Asset, StoreError>;

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError>;

    /// Assets matching `filter`, oldest first. A tag slug nobody uses
    /// matches nothing.
    async fn find_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError>;

    /// Apply a patch and emit an `Update` event tagged with `origin`.
    /// Fails with [`StoreError::Stale`] when the patch carries an
    /// `expected_revision` the record has moved past.
    async fn update_asset(
        &self,
        id: AssetId,
        patch: AssetPatch,
        origin: WriteOrigin,
    ) -> Result<Asset, StoreError>;

    /// Receive a notification for every asset write made after this call
    fn subscribe(&self) -> broadcast::Receiver<AssetEvent>;
}
