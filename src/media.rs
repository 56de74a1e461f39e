//! Local-disk media storage for content-block uploads.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use tokio::fs;
use uuid::Uuid;

#[derive(Clone)]
pub struct LocalMediaStorage {
    pub upload_dir: PathBuf,
    pub base_url: String,
}

impl LocalMediaStorage {
    pub fn new(upload_dir: String, base_url: String) -> Self {
        Self {
            upload_dir: PathBuf::from(upload_dir),
            base_url,
        }
    }

    /// Writes the upload under a fresh UUID filename (original extension
    /// preserved) and returns the public URL path.
    pub async fn save_media(
        &self,
        file_bytes: Bytes,
        original_filename: Option<String>,
    ) -> Result<String, std::io::Error> {
        let extension = original_filename
            .and_then(|name| {
                Path::new(&name)
                    .extension()
                    .and_then(|os_str| os_str.to_str())
                    .map(|s| s.to_owned())
            })
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let unique_filename = format!("{}{}", Uuid::new_v4(), extension);
        let file_path = self.upload_dir.join(&unique_filename);

        fs::create_dir_all(&self.upload_dir).await?;
        fs::write(&file_path, file_bytes).await?;

        Ok(format!("{}/{}", self.base_url, unique_filename))
    }

    pub async fn delete_media(&self, media_url: &str) -> Result<(), std::io::Error> {
        let path = Path::new(media_url);
        let path = path
            .strip_prefix(&self.base_url)
            .unwrap_or(path);
        let file_path = self.upload_dir.join(path);
        fs::remove_file(&file_path).await?;
        Ok(())
    }
}
