//! Local staging of in-flight uploads.
//!
//! A [`StagedFile`] owns its path on disk and removes it when dropped, so the
//! file goes away on every exit path of the request that created it, including
//! cancellation of the request future.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{pin_mut, Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

use super::validation::ValidationError;
use crate::error::{AppError, Result};

const MAX_STAGED_NAME_LEN: usize = 100;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<unix-millis>-<seq>-<name>`; the sequence keeps concurrent uploads of
    /// the same name within one millisecond apart.
    fn unique_path(&self, original_name: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let filename = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            seq,
            sanitize_filename(original_name)
        );
        self.root.join(filename)
    }

    /// Writes `body` to a fresh staged file, stopping as soon as more than
    /// `max_size` bytes have arrived.
    pub async fn stage<S, E>(
        &self,
        original_name: &str,
        content_type: &str,
        body: S,
        max_size: u64,
    ) -> Result<StagedFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send,
        E: Display + Send,
    {
        tokio::fs::create_dir_all(&self.root).await?;

        let mut staged = StagedFile {
            path: self.unique_path(original_name),
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            size: 0,
            created_at: Utc::now(),
        };

        let mut file = tokio::fs::File::create(&staged.path).await?;

        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| AppError::ClientStream(e.to_string()))?;

            staged.size += chunk.len() as u64;
            if staged.size > max_size {
                return Err(ValidationError::FileTooLarge {
                    size: staged.size,
                    max_size,
                }
                .into());
            }

            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!(
            path = %staged.path.display(),
            bytes = staged.size,
            "Staged upload"
        );

        Ok(staged)
    }
}

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_name: String,
    content_type: String,
    size: u64,
    created_at: DateTime<Utc>,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}

/// Keeps only the final path component and drops control characters.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_STAGED_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;

    fn body(chunks: Vec<&'static [u8]>) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.png"), "pic.png");
        assert_eq!(sanitize_filename("a\0b\nc.txt"), "abc.txt");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), MAX_STAGED_NAME_LEN);
    }

    #[test]
    fn test_unique_paths_for_same_name() {
        let area = StagingArea::new("/tmp/staging");
        let first = area.unique_path("photo.jpg");
        let second = area.unique_path("photo.jpg");

        assert_ne!(first, second);
        assert!(first.to_string_lossy().ends_with("-photo.jpg"));
        assert!(first.starts_with("/tmp/staging"));
    }

    #[tokio::test]
    async fn test_stage_writes_and_drop_removes() {
        let temp = TempDir::new().unwrap();
        let area = StagingArea::new(temp.path());

        let staged = area
            .stage("photo.jpg", "image/jpeg", body(vec![b"hello ", b"world"]), 1024)
            .await
            .unwrap();

        assert_eq!(staged.size(), 11);
        assert_eq!(staged.original_name(), "photo.jpg");
        assert_eq!(staged.content_type(), "image/jpeg");
        assert!(staged.created_at() <= Utc::now());
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello world");

        let path = staged.path().to_path_buf();
        drop(staged);

        assert!(!path.exists());
        assert_eq!(entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_stream_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let area = StagingArea::new(temp.path());

        let result = area
            .stage("big.bin", "application/octet-stream", body(vec![b"12345", b"6"]), 5)
            .await;

        assert!(matches!(
            result,
            Err(AppError::ValidationRejected(ValidationError::FileTooLarge { max_size: 5, .. }))
        ));
        assert_eq!(entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_exact_limit_is_accepted() {
        let temp = TempDir::new().unwrap();
        let area = StagingArea::new(temp.path());

        let staged = area
            .stage("exact.bin", "application/octet-stream", body(vec![b"123", b"45"]), 5)
            .await
            .unwrap();

        assert_eq!(staged.size(), 5);
    }

    #[tokio::test]
    async fn test_stream_error_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let area = StagingArea::new(temp.path());
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset")),
        ]);

        let result = area.stage("photo.jpg", "image/jpeg", failing, 1024).await;

        assert!(matches!(result, Err(AppError::ClientStream(msg)) if msg.contains("connection reset")));
        assert_eq!(entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_created() {
        let temp = TempDir::new().unwrap();
        let area = StagingArea::new(temp.path().join("nested").join("staging"));

        let staged = area
            .stage("photo.jpg", "image/jpeg", body(vec![b"x"]), 1024)
            .await
            .unwrap();

        assert!(staged.path().exists());
    }

    #[test]
    fn test_drop_tolerates_already_removed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.bin");
        let staged = StagedFile {
            path,
            original_name: "gone.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
            created_at: Utc::now(),
        };

        drop(staged);
    }
}
