use crate::models::{is_present, Asset, AssetPatch, TagId};
use crate::tagger::GeneratedMetadata;

/// Pick between a user-supplied and a generated value. User input wins
/// whenever it is non-blank; a blank generated value never replaces anything.
pub fn prefer_user<'a>(existing: Option<&'a str>, generated: Option<&'a str>) -> Option<&'a str> {
    if is_present(existing) {
        existing
    } else if is_present(generated) {
        generated
    } else {
        existing
    }
}

/// Existing tag associations win over generated ones
pub fn prefer_user_tags(existing: &[TagId], generated: Vec<TagId>) -> Vec<TagId> {
    if existing.is_empty() {
        generated
    } else {
        existing.to_vec()
    }
}

/// Build the update that applies generated metadata to `asset`. Only fields
/// that actually change are set, so an empty patch means nothing to write.
/// The patch is guarded by the revision it was computed from.
pub fn merge(asset: &Asset, generated: &GeneratedMetadata, tag_ids: Vec<TagId>) -> AssetPatch {
    let mut patch = AssetPatch {
        expected_revision: Some(asset.revision),
        ..AssetPatch::default()
    };

    let title = prefer_user(asset.title.as_deref(), Some(&generated.title));
    if title != asset.title.as_deref() {
        patch.title = title.map(str::to_string);
    }

    let alt_text = prefer_user(asset.alt_text.as_deref(), Some(&generated.alt_text));
    if alt_text != asset.alt_text.as_deref() {
        patch.alt_text = alt_text.map(str::to_string);
    }

    let tags = prefer_user_tags(&asset.tags, tag_ids);
    if tags != asset.tags {
        patch.tags = Some(tags);
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetId, FileRef, FileType};
    use std::time::SystemTime;

    fn asset() -> Asset {
        let now = SystemTime::now();
        Asset {
            id: AssetId::new(),
            title: None,
            description: Some("user description".to_string()),
            file_type: FileType::Image,
            alt_text: None,
            tags: Vec::new(),
            source: None,
            uploaded_by: None,
            file: FileRef::new("2024/05/01/sunset-beach.jpg"),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    fn generated() -> GeneratedMetadata {
        GeneratedMetadata {
            title: "Sunset Over the Beach".to_string(),
            alt_text: "A golden sunset".to_string(),
            tag_names: vec!["sunset".to_string()],
        }
    }

    #[test]
    fn test_prefer_user() {
        assert_eq!(prefer_user(Some("Mine"), Some("Generated")), Some("Mine"));
        assert_eq!(prefer_user(None, Some("Generated")), Some("Generated"));
        assert_eq!(prefer_user(Some("  "), Some("Generated")), Some("Generated"));
        assert_eq!(prefer_user(Some("Mine"), None), Some("Mine"));
        assert_eq!(prefer_user(None, Some("")), None);
        assert_eq!(prefer_user(Some(""), Some(" ")), Some(""));
        assert_eq!(prefer_user(None, None), None);
    }

    #[test]
    fn test_prefer_user_tags() {
        let mine = vec![TagId::new()];
        let generated = vec![TagId::new(), TagId::new()];
        assert_eq!(prefer_user_tags(&mine, generated.clone()), mine);
        assert_eq!(prefer_user_tags(&[], generated.clone()), generated);
    }

    #[test]
    fn test_merge_fills_empty_fields() {
        let tag = TagId::new();
        let patch = merge(&asset(), &generated(), vec![tag]);

        assert_eq!(patch.title.as_deref(), Some("Sunset Over the Beach"));
        assert_eq!(patch.alt_text.as_deref(), Some("A golden sunset"));
        assert_eq!(patch.tags, Some(vec![tag]));
        assert!(patch.description.is_none());
        assert!(patch.file.is_none());
        assert_eq!(patch.expected_revision, Some(0));
    }

    #[test]
    fn test_merge_keeps_user_values() {
        let mut asset = asset();
        asset.title = Some("My Title".to_string());
        asset.alt_text = Some("My alt".to_string());
        asset.tags = vec![TagId::new()];

        let patch = merge(&asset, &generated(), vec![TagId::new()]);

        assert!(patch.is_empty());
    }

    #[test]
    fn test_merge_partial_user_input() {
        let mut asset = asset();
        asset.title = Some("My Title".to_string());

        let patch = merge(&asset, &generated(), Vec::new());

        assert!(patch.title.is_none());
        assert_eq!(patch.alt_text.as_deref(), Some("A golden sunset"));
        assert!(patch.tags.is_none());
    }

    #[test]
    fn test_merge_with_empty_generation_is_noop() {
        let patch = merge(&asset(), &GeneratedMetadata::default(), Vec::new());
        assert!(patch.is_empty());
    }
}
