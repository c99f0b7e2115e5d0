use crate::constants;
use crate::error::StoreError;
use crate::models::{
    Asset, AssetEvent, AssetFilter, AssetId, AssetPatch, NewAsset, Tag, TagId, WriteOperation,
    WriteOrigin,
};
use crate::slug;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::{broadcast, RwLock};

/// On-disk layout of the JSON snapshot
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    assets: Vec<Asset>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Clone, Default)]
struct State {
    assets: HashMap<AssetId, Asset>,
    tags: HashMap<TagId, Tag>,
    /// slug -> tag, the uniqueness constraint
    slugs: HashMap<String, TagId>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut state = State::default();
        for tag in snapshot.tags {
            if state.slugs.insert(tag.slug.clone(), tag.id).is_some() {
                return Err(StoreError::InvalidInput(format!(
                    "snapshot contains duplicate tag slug '{}'",
                    tag.slug
                )));
            }
            state.tags.insert(tag.id, tag);
        }
        for asset in snapshot.assets {
            state.assets.insert(asset.id, asset);
        }
        Ok(state)
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut assets: Vec<Asset> = self.assets.values().cloned().collect();
        assets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let mut tags: Vec<Tag> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.slug.cmp(&b.slug));
        Snapshot { assets, tags }
    }

    fn check_tags_exist(&self, ids: &[TagId]) -> Result<(), StoreError> {
        match ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(missing) => Err(StoreError::InvalidInput(format!("unknown tag id {}", missing))),
            None => Ok(()),
        }
    }
}

/// In-process store with slug uniqueness, change notifications and an
/// optional JSON snapshot rewritten after every write
pub struct LocalStore {
    state: RwLock<State>,
    events: broadcast::Sender<AssetEvent>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Create an empty, memory-only store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(constants::EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(State::default()),
            events,
            path: None,
        }
    }

    /// Open a store backed by a JSON snapshot, creating it on first write
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => State::default(),
            Ok(content) => State::from_snapshot(serde_json::from_str(&content)?)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            path = %path.display(),
            assets = state.assets.len(),
            tags = state.tags.len(),
            "Opened asset store"
        );

        let mut store = Self::new();
        store.state = RwLock::new(state);
        store.path = Some(path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, state: &State) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated snapshot
        let content = serde_json::to_string_pretty(&state.to_snapshot())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Persist the staged state, then make it live. A failed snapshot
    /// write leaves the in-memory state untouched.
    async fn commit(&self, state: &mut State, next: State) -> Result<(), StoreError> {
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    fn notify(&self, event: AssetEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for LocalStore {
    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .slugs
            .get(slug)
            .and_then(|id| state.tags.get(id))
            .cloned())
    }

    async fn find_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(tags)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, StoreError> {
        let slug = slug::normalize(name);
        if slug.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "tag name '{}' has no usable slug",
                name
            )));
        }

        let mut state = self.state.write().await;
        if state.slugs.contains_key(&slug) {
            return Err(StoreError::Conflict { slug });
        }

        let tag = Tag {
            id: TagId::new(),
            name: name.trim().to_string(),
            slug: slug.clone(),
            created_at: SystemTime::now(),
        };
        let mut next = state.clone();
        next.slugs.insert(slug, tag.id);
        next.tags.insert(tag.id, tag.clone());
        self.commit(&mut state, next).await?;

        Ok(tag)
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<Asset, StoreError> {
        let mut state = self.state.write().await;
        state.check_tags_exist(&asset.tags)?;

        let now = SystemTime::now();
        let created = Asset {
            id: AssetId::new(),
            title: asset.title,
            description: asset.description,
            file_type: asset.file_type,
            alt_text: asset.alt_text,
            tags: dedup_ids(asset.tags),
            source: asset.source,
            uploaded_by: asset.uploaded_by,
            file: asset.file,
            created_at: now,
            updated_at: now,
            revision: 0,
        };
        let mut next = state.clone();
        next.assets.insert(created.id, created.clone());
        self.commit(&mut state, next).await?;
        drop(state);

        self.notify(AssetEvent {
            operation: WriteOperation::Create,
            current: created.clone(),
            previous: None,
            origin: WriteOrigin::User,
        });

        Ok(created)
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        Ok(self.state.read().await.assets.get(&id).cloned())
    }

    async fn find_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let state = self.state.read().await;

        let tag_id = match filter.tag_slug.as_deref() {
            Some(tag_slug) => match state.slugs.get(&slug::normalize(tag_slug)) {
                Some(id) => Some(*id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut assets: Vec<Asset> = state
            .assets
            .values()
            .filter(|asset| tag_id.map_or(true, |id| asset.tags.contains(&id)))
            .filter(|asset| filter.matches_text(asset))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(assets)
    }

    async fn update_asset(
        &self,
        id: AssetId,
        patch: AssetPatch,
        origin: WriteOrigin,
    ) -> Result<Asset, StoreError> {
        let mut state = self.state.write().await;
        if let Some(tags) = &patch.tags {
            state.check_tags_exist(tags)?;
        }

        let previous = state
            .assets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("asset {}", id)))?;
        if let Some(expected) = patch.expected_revision {
            if previous.revision != expected {
                return Err(StoreError::Stale {
                    id: id.to_string(),
                    expected,
                    actual: previous.revision,
                });
            }
        }

        let mut current = previous.clone();
        if let Some(title) = patch.title {
            current.title = Some(title);
        }
        if let Some(description) = patch.description {
            current.description = Some(description);
        }
        if let Some(alt_text) = patch.alt_text {
            current.alt_text = Some(alt_text);
        }
        if let Some(tags) = patch.tags {
            current.tags = dedup_ids(tags);
        }
        if let Some(source) = patch.source {
            current.source = Some(source);
        }
        if let Some(file) = patch.file {
            current.file = file;
        }
        if let Some(file_type) = patch.file_type {
            current.file_type = file_type;
        }
        current.updated_at = SystemTime::now();
        current.revision = previous.revision + 1;

        let mut next = state.clone();
        next.assets.insert(id, current.clone());
        self.commit(&mut state, next).await?;
        drop(state);

        self.notify(AssetEvent {
            operation: WriteOperation::Update,
            current: current.clone(),
            previous: Some(previous),
            origin,
        });

        Ok(current)
    }

    fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.events.subscribe()
    }
}

fn dedup_ids(ids: Vec<TagId>) -> Vec<TagId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
