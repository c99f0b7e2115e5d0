use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

/// Store-assigned identity of an asset record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AssetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Store-assigned identity of a tag record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(Uuid);

impl TagId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of media an asset holds. Chosen by the uploader, never by enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Image,
    #[serde(rename = "SVG")]
    Svg,
    Lottie,
    Video,
    #[serde(rename = "PDF")]
    Pdf,
    Other,
}

impl FileType {
    /// Best guess from a lowercase file extension (without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "avif" | "bmp" | "tif" | "tiff" | "heic" => {
                FileType::Image
            }
            "svg" => FileType::Svg,
            "lottie" | "json" => FileType::Lottie,
            "mp4" | "mov" | "webm" | "mkv" | "avi" | "m4v" => FileType::Video,
            "pdf" => FileType::Pdf,
            _ => FileType::Other,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileType::Image => "Image",
            FileType::Svg => "SVG",
            FileType::Lottie => "Lottie",
            FileType::Video => "Video",
            FileType::Pdf => "PDF",
            FileType::Other => "Other",
        };
        f.write_str(label)
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(FileType::Image),
            "svg" => Ok(FileType::Svg),
            "lottie" => Ok(FileType::Lottie),
            "video" => Ok(FileType::Video),
            "pdf" => Ok(FileType::Pdf),
            "other" => Ok(FileType::Other),
            other => Err(format!(
                "unknown file type '{}' (expected image, svg, lottie, video, pdf or other)",
                other
            )),
        }
    }
}

/// Reference to the stored binary object, e.g. `2024/05/01/sunset-beach.jpg`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Lay a filename out under a `YYYY/MM/DD/` upload directory
    pub fn dated(filename: &str, date: NaiveDate) -> Self {
        Self(format!(
            "{:04}/{:02}/{:02}/{}",
            date.year(),
            date.month(),
            date.day(),
            filename
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base filename with every directory component stripped
    pub fn file_name(&self) -> &str {
        self.0
            .rsplit(|c: char| c == '/' || c == '\\')
            .find(|part| !part.is_empty())
            .unwrap_or("")
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media file record with descriptive metadata and tag associations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub id: AssetId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub file_type: FileType,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    pub file: FileRef,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Bumped by the store on every update
    #[serde(default)]
    pub revision: u64,
}

impl Asset {
    pub fn has_title(&self) -> bool {
        is_present(self.title.as_deref())
    }

    pub fn has_alt_text(&self) -> bool {
        is_present(self.alt_text.as_deref())
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// True when every field enrichment could fill is already set
    pub fn is_fully_described(&self) -> bool {
        self.has_title() && self.has_alt_text() && self.has_tags()
    }
}

/// Whether an optional text field carries something other than whitespace
pub fn is_present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// A named, slug-keyed label attachable to many assets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: SystemTime,
}

/// Data supplied by the uploader when an asset is first created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub file: FileRef,
    pub file_type: FileType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub tags: Vec<TagId>,
    pub source: Option<String>,
    pub uploaded_by: Option<String>,
}

impl NewAsset {
    pub fn new(file: FileRef, file_type: FileType) -> Self {
        Self {
            file,
            file_type,
            title: None,
            description: None,
            alt_text: None,
            tags: Vec::new(),
            source: None,
            uploaded_by: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagId>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn uploaded_by(mut self, actor: impl Into<String>) -> Self {
        self.uploaded_by = Some(actor.into());
        self
    }
}

/// Partial update of an asset. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub tags: Option<Vec<TagId>>,
    pub source: Option<String>,
    pub file: Option<FileRef>,
    pub file_type: Option<FileType>,
    /// Apply only if the stored record is still at this revision;
    /// otherwise the store answers [`StoreError::Stale`](crate::error::StoreError::Stale)
    pub expected_revision: Option<u64>,
}

impl AssetPatch {
    /// True when the patch changes no field. `expected_revision` is a
    /// precondition, not a change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.alt_text.is_none()
            && self.tags.is_none()
            && self.source.is_none()
            && self.file.is_none()
            && self.file_type.is_none()
    }
}

/// Narrows [`Store::find_assets`](crate::store::Store::find_assets).
/// Empty criteria match every asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilter {
    /// Only assets carrying the tag with this slug
    pub tag_slug: Option<String>,
    /// Case-insensitive text looked up in title, description, alt text
    /// and file name
    pub search: Option<String>,
}

impl AssetFilter {
    pub fn with_tag(mut self, tag_slug: impl Into<String>) -> Self {
        self.tag_slug = Some(tag_slug.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Whether `asset` matches the search text. The tag criterion needs
    /// the tag table and is resolved by the store.
    pub fn matches_text(&self, asset: &Asset) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            asset.title.as_deref(),
            asset.description.as_deref(),
            asset.alt_text.as_deref(),
            Some(asset.file.file_name()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Kind of write that produced an [`AssetEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOperation {
    Create,
    Update,
}

/// Who issued a write. Enrichment's own writes never re-trigger enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOrigin {
    User,
    Enrichment,
}

/// Change notification emitted by the store once per asset write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEvent {
    pub operation: WriteOperation,
    pub current: Asset,
    pub previous: Option<Asset>,
    pub origin: WriteOrigin,
}

impl AssetEvent {
    /// Whether the underlying file reference differs from the previous version
    pub fn file_changed(&self) -> bool {
        match &self.previous {
            Some(previous) => previous.file != self.current.file,
            None => true,
        }
    }
}
