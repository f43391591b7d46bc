//! Raw HTML response archive
//!
//! When enabled, every fetched body is stored verbatim as `<id>.html`.
//! Old files are pruned by modification time at shutdown.

use crate::output::OutputResult;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Stores raw responses under a fixed directory
#[derive(Debug, Clone)]
pub struct ResponseArchive {
    dir: PathBuf,
    enabled: bool,
}

impl ResponseArchive {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// An archive that never writes anything
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `content` to `<dir>/<id>.html` if the archive is enabled
    ///
    /// # Returns
    ///
    /// * `Ok(Some(PathBuf))` - The file that was written
    /// * `Ok(None)` - The archive is disabled
    pub async fn save(&self, content: &str, id: &str) -> OutputResult<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.html", id));
        tokio::fs::write(&path, content).await?;

        tracing::debug!("Saved raw response to {}", path.display());
        Ok(Some(path))
    }

    /// Deletes archived responses last modified more than `retention_days` ago
    ///
    /// Returns the number of files removed. A missing directory removes nothing.
    pub fn cleanup(&self, retention_days: u64) -> OutputResult<usize> {
        let cutoff = retention_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.cleanup_before(cutoff)
    }

    /// Deletes archived responses last modified before `cutoff`
    pub fn cleanup_before(&self, cutoff: SystemTime) -> OutputResult<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            if metadata.modified()? < cutoff {
                fs::remove_file(entry.path())?;
                tracing::debug!("Removed expired response {}", entry.path().display());
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_writes_verbatim() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path().join("responses"), true);

        let path = archive
            .save("<html>Привет</html>", "page_1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "page_1.html");
        assert_eq!(fs::read_to_string(path).unwrap(), "<html>Привет</html>");
    }

    #[tokio::test]
    async fn test_disabled_archive_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path().join("responses"), false);

        assert!(archive.save("<html></html>", "page_1").await.unwrap().is_none());
        assert!(!dir.path().join("responses").exists());
    }

    fn age_file(path: &Path, days: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        let past = SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY);
        file.set_modified(past).unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_files() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path(), true);

        let old = archive.save("old", "old").await.unwrap().unwrap();
        archive.save("new", "new").await.unwrap();
        age_file(&old, 10);

        let removed = archive.cleanup(3).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("old.html").exists());
        assert!(dir.path().join("new.html").exists());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_fresh_files() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path(), true);
        archive.save("fresh", "fresh").await.unwrap();

        assert_eq!(archive.cleanup(3).unwrap(), 0);
        assert!(dir.path().join("fresh.html").exists());
    }

    #[tokio::test]
    async fn test_cleanup_with_huge_retention_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path(), true);
        let old = archive.save("old", "old").await.unwrap().unwrap();
        age_file(&old, 10);

        assert_eq!(archive.cleanup(u64::MAX / 1000).unwrap(), 0);
        assert_eq!(archive.cleanup(u64::MAX).unwrap(), 0);
        assert!(old.exists());
    }

    #[test]
    fn test_cleanup_missing_directory() {
        let dir = TempDir::new().unwrap();
        let archive = ResponseArchive::new(dir.path().join("absent"), true);
        assert_eq!(archive.cleanup(3).unwrap(), 0);
    }
}
