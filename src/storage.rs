//! One JSON file per harvested article.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 6f1c…e2.json
//! ├── 9a03…7b.json
//! └── images/
//!     └── Qx81mZ0aLkP3vT7c.jpg
//! ```
//!
//! Identifiers are fresh per record, so files are never overwritten. There
//! is no index and no atomic rename: a crash mid-write can leave a truncated
//! file behind.

use crate::error::{HarvestError, Result};
use crate::models::ArticleRecord;
use crate::utils::ensure_writable_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Directory of persisted article records.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    dir: PathBuf,
}

impl ArticleStore {
    /// Subdirectory holding downloaded images.
    pub const IMAGE_DIR: &'static str = "images";

    /// Create (if needed) and probe the output directory.
    ///
    /// This is the one failure that aborts a run.
    ///
    /// # Arguments
    ///
    /// * `dir` - Output directory for records and the `images/` subdirectory
    ///
    /// # Errors
    ///
    /// [`HarvestError::Storage`] when the directory cannot be created or a
    /// probe file cannot be written into it.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
    pub async fn open(dir: &Path) -> Result<Self> {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(error = %e, "Output directory is not writable");
            return Err(HarvestError::Storage {
                path: dir.display().to_string(),
                source: e,
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn image_dir(&self) -> PathBuf {
        self.dir.join(Self::IMAGE_DIR)
    }

    pub fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write `record` to `<dir>/<id>.json`.
    ///
    /// # Arguments
    ///
    /// * `record` - The accepted article; its fresh id names the file
    ///
    /// # Returns
    ///
    /// The path written.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Storage`] when the file cannot be written, for example
    /// because the directory disappeared after [`ArticleStore::open`]. The
    /// pipeline counts it and moves on.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let store = ArticleStore::open(Path::new("articles")).await?;
    /// let path = store.write(&record).await?;
    /// assert_eq!(path, store.path_for(&record.id));
    /// ```
    #[instrument(level = "info", skip_all, fields(id = %record.id))]
    pub async fn write(&self, record: &ArticleRecord) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(record)?;
        let path = self.path_for(&record.id);
        fs::write(&path, json)
            .await
            .map_err(|source| HarvestError::Storage {
                path: path.display().to_string(),
                source,
            })?;
        info!(path = %path.display(), "Wrote article record");
        Ok(path)
    }

    /// Read a record back by identifier.
    #[cfg(test)]
    pub async fn load(&self, id: &Uuid) -> Result<ArticleRecord> {
        let path = self.path_for(id);
        let raw = fs::read_to_string(&path)
            .await
            .map_err(|source| HarvestError::Storage {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedFields, CATEGORY};
    use chrono::DateTime;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("articles");
        let store = ArticleStore::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.image_dir(), dir.join("images"));
    }

    #[tokio::test]
    async fn test_open_fails_when_path_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let err = ArticleStore::open(&file).await.unwrap_err();
        assert!(matches!(err, HarvestError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::open(tmp.path()).await.unwrap();

        let fields = ExtractedFields {
            title: "Rains boost maize yield".to_string(),
            description: "Farmers in the Rift Valley expect a bumper harvest.".to_string(),
            posted_at: Some("May 6, 2025".to_string()),
            image_url: Some("https://site/img/maize.jpg".to_string()),
            ..Default::default()
        };
        let record = ArticleRecord::new(fields, "Farm Desk", "https://site/agriculture/x-1");
        let path = store.write(&record).await.unwrap();
        assert_eq!(path, store.path_for(&record.id));

        let loaded = store.load(&record.id).await.unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.title, "Rains boost maize yield");
        assert_eq!(loaded.description, "Farmers in the Rift Valley expect a bumper harvest.");
        assert_eq!(loaded.category, CATEGORY);
        assert_eq!(loaded.source_name, "Farm Desk");
        assert_eq!(loaded.source_url, "https://site/agriculture/x-1");
        assert_eq!(loaded.posted_at.as_deref(), Some("May 6, 2025"));
        assert_eq!(loaded.image_url.as_deref(), Some("https://site/img/maize.jpg"));
        assert_eq!(loaded.image_path, "");
        assert!(DateTime::parse_from_rfc3339(&loaded.created_at).is_ok());
        assert!(DateTime::parse_from_rfc3339(&loaded.updated_at).is_ok());
    }

    #[tokio::test]
    async fn test_write_fails_when_directory_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("articles");
        let store = ArticleStore::open(&dir).await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let fields = ExtractedFields {
            title: "Rains boost maize yield".to_string(),
            ..Default::default()
        };
        let record = ArticleRecord::new(fields, "Farm Desk", "https://site/agriculture/x-1");
        let err = store.write(&record).await.unwrap_err();
        assert!(matches!(err, HarvestError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::open(tmp.path()).await.unwrap();
        let err = store.load(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, HarvestError::Storage { .. }));
    }
}
