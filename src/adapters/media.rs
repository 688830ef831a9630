use crate::common::error::{AppError, ServiceResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

const IMAGE_DIR: &str = "chat_images";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Local file storage for message image attachments.
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Writes the image under a random name and returns its path relative
    /// to the media root.
    pub async fn save_image(&self, filename: Option<&str>, data: &[u8]) -> ServiceResult<String> {
        if data.is_empty() {
            return Err(AppError::MessagesInvalidImage);
        }
        let extension = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .ok_or(AppError::MessagesInvalidImage)?;

        let relative_path = format!("{IMAGE_DIR}/{}.{extension}", Uuid::new_v4().simple());
        let directory = self.root.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&directory).await?;
        tokio::fs::write(self.root.join(&relative_path), data).await?;
        info!(path = relative_path, size = data.len(), "Stored message image");
        Ok(relative_path)
    }

    /// Best-effort removal of a stored image.
    pub async fn remove(&self, relative_path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative_path)).await {
            warn!(path = relative_path, "Failed to remove message image: {e}");
        }
    }

    pub fn url_for(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_images_below_media_root() {
        let root = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(root.path(), "https://cdn.example.com/media/");
        let path = media
            .save_image(Some("photo.PNG"), b"\x89PNG fake")
            .await
            .unwrap();

        assert!(path.starts_with("chat_images/"));
        assert!(path.ends_with(".png"));
        assert_eq!(std::fs::read(root.path().join(&path)).unwrap(), b"\x89PNG fake");
        assert_eq!(
            media.url_for(&path),
            format!("https://cdn.example.com/media/{path}")
        );

        media.remove(&path).await;
        assert!(!root.path().join(&path).exists());
    }

    #[tokio::test]
    async fn rejects_unknown_or_empty_images() {
        let root = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(root.path(), "/media");
        assert_eq!(
            media.save_image(Some("notes.txt"), b"text").await,
            Err(AppError::MessagesInvalidImage)
        );
        assert_eq!(
            media.save_image(None, b"data").await,
            Err(AppError::MessagesInvalidImage)
        );
        assert_eq!(
            media.save_image(Some("a.png"), b"").await,
            Err(AppError::MessagesInvalidImage)
        );
    }
}
