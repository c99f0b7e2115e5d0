use crate::models::FileType;
use std::path::Path;

/// Get file extension from path (without the dot)
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Guess the asset file type from the path's extension
pub fn infer_file_type(path: &Path) -> FileType {
    get_extension(path)
        .map(|ext| FileType::from_extension(&ext))
        .unwrap_or(FileType::Other)
}
