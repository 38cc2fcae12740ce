//! Upload intake and explicit removal.
//!
//! An upload's stored name is `<uuid-v4>_<sanitised client name>`. The random
//! prefix makes names unguessable and guarantees that two uploads of
//! `photo.jpg` never collide; the suffix keeps names recognisable in logs.

use crate::error::ImgPdfError;
use crate::storage::{Storage, StoredImage};
use tracing::{info, warn};
use uuid::Uuid;

/// Extensions accepted on upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// True when `filename` ends in `.jpg` or `.jpeg`, ignoring case.
///
/// A bare `.jpg` counts.
pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')))
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Path separators become word breaks, runs of whitespace collapse to `_`,
/// every character outside `[A-Za-z0-9._-]` is dropped, and leading or
/// trailing dots and underscores are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Validate and persist one uploaded file.
///
/// `client_name` is `None` when the multipart form carried no `file` field.
pub async fn accept_upload(
    storage: &Storage,
    client_name: Option<&str>,
    bytes: Vec<u8>,
) -> Result<StoredImage, ImgPdfError> {
    let client_name = match client_name {
        Some(n) if !n.is_empty() => n,
        _ => return Err(ImgPdfError::Validation("No file selected".into())),
    };

    if !has_allowed_extension(client_name) {
        warn!("Rejected upload with unsupported name: {:?}", client_name);
        return Err(ImgPdfError::Validation(
            "Only JPG/JPEG files are supported".into(),
        ));
    }

    // Never empty: the extension's letters are ASCII and always kept, even
    // when the dot is trimmed (`照片.JPG` becomes `JPG`).
    let safe = sanitize_filename(client_name);
    let stored_name = format!("{}_{}", Uuid::new_v4(), safe);

    let stored = storage.save(&stored_name, bytes).await?;
    info!(
        "Upload accepted: {:?} → {} ({} bytes)",
        client_name, stored.name, stored.size
    );
    Ok(stored)
}

/// Delete one stored file on client request.
pub async fn remove_upload(storage: &Storage, name: Option<&str>) -> Result<(), ImgPdfError> {
    let name = match name {
        Some(n) if !n.is_empty() => n,
        _ => return Err(ImgPdfError::Validation("No file specified".into())),
    };

    storage.remove(name).await.inspect_err(|e| {
        warn!("Removal of {} failed: {}", name, e);
    })?;
    info!("Removed upload {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_allowed_extension("photo.JPEG"));
        assert!(has_allowed_extension("photo.jpg"));
        assert!(has_allowed_extension("a.b.JpG"));
        assert!(!has_allowed_extension("photo.png"));
        assert!(!has_allowed_extension("jpg"));
        assert!(!has_allowed_extension("photo.jpg.exe"));
        assert!(!has_allowed_extension("photojpg"));
        assert!(has_allowed_extension(".jpg"));
        assert!(has_allowed_extension(".JPEG"));
    }

    #[test]
    fn sanitize_strips_paths_and_junk() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("My Holiday Photo.jpg"), "My_Holiday_Photo.jpg");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.jpeg"), "C_Users_me_pic.jpeg");
        assert_eq!(sanitize_filename("na$me!.jpg"), "name.jpg");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[tokio::test]
    async fn upload_prefixes_a_fresh_identifier() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();

        let a = accept_upload(&storage, Some("photo.jpg"), vec![1]).await.unwrap();
        let b = accept_upload(&storage, Some("photo.jpg"), vec![2]).await.unwrap();

        assert_ne!(a.name, b.name);
        assert!(a.name.ends_with("_photo.jpg"));
        let prefix = a.name.trim_end_matches("_photo.jpg");
        assert!(Uuid::parse_str(prefix).is_ok(), "prefix {prefix:?}");
        assert_eq!(storage.read(&b.name).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn upload_rejects_missing_or_wrong_names() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();

        for name in [None, Some(""), Some("photo.png")] {
            let err = accept_upload(&storage, name, vec![1]).await.unwrap_err();
            assert!(matches!(err, ImgPdfError::Validation(_)), "{name:?}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_keeps_only_safe_characters() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();
        let stored = accept_upload(&storage, Some("照片.JPG"), vec![1]).await.unwrap();
        assert!(stored.name.ends_with("_JPG"), "{}", stored.name);
    }

    #[tokio::test]
    async fn bare_extension_name_is_accepted() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();
        let stored = accept_upload(&storage, Some(".jpg"), vec![1]).await.unwrap();
        assert!(stored.name.ends_with("_jpg"), "{}", stored.name);
        assert_eq!(storage.read(&stored.name).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn remove_twice_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();
        let stored = accept_upload(&storage, Some("x.jpeg"), vec![9]).await.unwrap();

        remove_upload(&storage, Some(&stored.name)).await.unwrap();
        let err = remove_upload(&storage, Some(&stored.name)).await.unwrap_err();
        assert!(matches!(err, ImgPdfError::NotFound { .. }));
    }

    #[tokio::test]
    async fn remove_without_name_is_validation() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();
        let err = remove_upload(&storage, None).await.unwrap_err();
        assert!(matches!(err, ImgPdfError::Validation(_)));
    }
}
