//! Media path utility functions / 媒体路径工具函数

use std::path::{Component, Path, PathBuf};

/// Resolve a stored media file name against the media directory.
///
/// Rejects absolute paths and any `..` component so a bad database row can
/// never read outside the media directory.
pub fn media_file_path(media_dir: &Path, file: &str) -> Option<PathBuf> {
    let relative = Path::new(file);
    if relative.is_absolute() {
        return None;
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(media_dir.join(relative))
}

/// Build a Content-Disposition attachment value with a UTF-8 encoded
/// filename fallback (media refs include non-ASCII words).
pub fn attachment_disposition(filename: &str) -> String {
    let encoded = urlencoding::encode(filename);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        filename, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_file_path() {
        let dir = Path::new("media");
        assert_eq!(
            media_file_path(dir, "sounds/perro.wav"),
            Some(PathBuf::from("media/sounds/perro.wav"))
        );
        assert_eq!(media_file_path(dir, "../secrets.txt"), None);
        assert_eq!(media_file_path(dir, "a/../../b"), None);
        assert_eq!(media_file_path(dir, "/etc/passwd"), None);
    }

    #[test]
    fn test_attachment_disposition_encodes_utf8() {
        let value = attachment_disposition("привет.wav");
        assert!(value.starts_with("attachment;"));
        assert!(value.contains("filename*=UTF-8''%D0%BF"));
    }
}
