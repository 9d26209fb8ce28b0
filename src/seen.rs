//! The set of URLs already offered to the extraction step.
//!
//! Without a log file the set lives for one run only. With one, the set is
//! seeded from the file at open and every insertion is appended to it, one
//! URL per line, so a URL handled by an earlier run is skipped by later runs.
//! A crash mid-append can leave a partial last line; it is read back as a
//! URL that never matches.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

#[derive(Debug, Default)]
pub struct SeenSet {
    urls: HashSet<String>,
    log: Option<PathBuf>,
}

impl SeenSet {
    /// An empty, process-local set.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a set backed by an append-only log, creating the file if absent.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn with_log(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let urls = match fs::read_to_string(path).await {
            Ok(raw) => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e),
        };
        info!(count = urls.len(), "Loaded seen URLs");
        Ok(Self {
            urls,
            log: Some(path.to_path_buf()),
        })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Record `url`; returns `false` if it was already present.
    ///
    /// The in-memory set is updated even when appending to the log fails.
    pub async fn insert(&mut self, url: &str) -> std::io::Result<bool> {
        if !self.urls.insert(url.to_string()) {
            return Ok(false);
        }
        if let Some(path) = &self.log {
            let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
            file.write_all(format!("{url}\n").as_bytes()).await?;
            debug!(%url, "Appended to seen log");
        }
        Ok(true)
    }
}
