// src/utils/storage.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::AppError, utils::form::UploadedFile};

/// Blob store for uploaded game images.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `file` under `namespace` and returns its public URL.
    async fn upload(&self, namespace: &str, file: &UploadedFile) -> Result<String, AppError>;

    /// Removes a file previously returned by `upload`.
    async fn remove(&self, url: &str) -> Result<(), AppError>;
}

/// Stores files on local disk, served by the router under `public_url`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a public URL back to a path below `root`.
    /// Returns `None` for foreign URLs and anything that could escape the root.
    fn relative_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        let rest = url.strip_prefix(self.public_url.as_str())?.strip_prefix('/')?;
        let escapes = rest
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        if escapes { None } else { Some(rest) }
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn file_extension(file: &UploadedFile) -> String {
    let from_name = Path::new(&file.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        file.content_type
            .as_deref()
            .and_then(|ct| ct.strip_prefix("image/"))
            .filter(|sub| sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_string()
    })
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, namespace: &str, file: &UploadedFile) -> Result<String, AppError> {
        if !is_valid_namespace(namespace) {
            return Err(AppError::BadRequest(format!("Invalid upload namespace '{}'", namespace)));
        }

        let is_image = file
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(AppError::BadRequest("Only image files are allowed".to_string()));
        }

        if file.bytes.is_empty() {
            return Err(AppError::BadRequest("Empty file not allowed".to_string()));
        }

        let dir = self.root.join(namespace);
        let name = format!("{}.{}", Uuid::new_v4(), file_extension(file));

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::error!("Failed to create upload directory {:?}: {:?}", dir, e);
            AppError::BadRequest("File upload failed".to_string())
        })?;

        tokio::fs::write(dir.join(&name), &file.bytes).await.map_err(|e| {
            tracing::error!("Failed to write upload {}: {:?}", name, e);
            AppError::BadRequest("File upload failed".to_string())
        })?;

        Ok(format!("{}/{}/{}", self.public_url, namespace, name))
    }

    async fn remove(&self, url: &str) -> Result<(), AppError> {
        let relative = self
            .relative_path(url)
            .ok_or_else(|| AppError::BadRequest(format!("'{}' is not a stored file", url)))?;

        tokio::fs::remove_file(self.root.join(relative))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to remove {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn temp_storage() -> LocalFileStorage {
        let root = std::env::temp_dir().join(format!("tta-storage-{}", Uuid::new_v4()));
        LocalFileStorage::new(root, "/uploads/")
    }

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG fake"),
        }
    }

    #[tokio::test]
    async fn test_upload_then_remove() {
        let storage = temp_storage();

        let url = storage.upload("type-the-answer", &png("Cover.PNG")).await.unwrap();
        assert!(url.starts_with("/uploads/type-the-answer/"));
        assert!(url.ends_with(".png"));

        let relative = storage.relative_path(&url).unwrap().to_string();
        let path = storage.root.join(&relative);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\x89PNG fake");

        storage.remove(&url).await.unwrap();
        assert!(!path.exists());

        // A second removal fails, which callers only log.
        assert!(storage.remove(&url).await.is_err());

        let _ = tokio::fs::remove_dir_all(&storage.root).await;
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let storage = temp_storage();
        let file = UploadedFile {
            file_name: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(b"hello"),
        };

        let err = storage.upload("type-the-answer", &file).await.unwrap_err();
        assert_eq!(err.message(), "Only image files are allowed");
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let storage = temp_storage();
        let mut file = png("a.png");
        file.bytes = Bytes::new();

        assert!(storage.upload("type-the-answer", &file).await.is_err());
    }

    #[test]
    fn test_paths_outside_root_are_refused() {
        let storage = temp_storage();
        assert_eq!(storage.relative_path("/uploads/ns/a.png"), Some("ns/a.png"));
        assert!(storage.relative_path("/uploads/../etc/passwd").is_none());
        assert!(storage.relative_path("/elsewhere/a.png").is_none());
        assert!(storage.relative_path("/uploadsx/a.png").is_none());
    }

    #[test]
    fn test_extension_falls_back_to_content_type() {
        let mut file = png("cover");
        file.content_type = Some("image/webp".to_string());
        assert_eq!(file_extension(&file), "webp");
    }
}
