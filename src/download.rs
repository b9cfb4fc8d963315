use std::path::{Path as LocalPath, PathBuf};
use std::sync::Arc;

use futures::stream::TryStreamExt;
use object_store::{path::Path, ObjectStore};
use tokio::io::AsyncWriteExt;

use crate::store::StoreError;
use crate::tasks::Task;

/// Where a task ended up locally; `local_path` is `None` when the fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub task: Task,
    pub local_path: Option<PathBuf>,
}

/// Fetches release assets into the scratch directory, one file per task.
pub struct Downloader {
    source: Arc<dyn ObjectStore>,
    base_url: String,
    scratch_dir: PathBuf,
}

impl Downloader {
    /// `source` must be rooted at `base_url`; the URL itself is only used for logs.
    pub fn new(
        source: Arc<dyn ObjectStore>,
        base_url: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Never fails: errors are logged and reported as a missing local path.
    pub async fn fetch(&self, task: Task) -> DownloadResult {
        let url = task.source_url(&self.base_url);
        let file_path = self.scratch_dir.join(task.file_name());

        log::info!("Downloading {}...", url);

        let local_path = match self.fetch_to(&task, &file_path).await {
            Ok(written) => {
                log::info!("Downloaded: {}", file_path.display());
                log::debug!("{} bytes written for {}", written, task);
                Some(file_path)
            }
            Err(e) => {
                log::error!("Failed to download {}: {}", url, e);
                // leftovers of a half-written body must not reach the upload phase
                if let Err(e) = tokio::fs::remove_file(&file_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("could not remove {}: {}", file_path.display(), e);
                    }
                }
                None
            }
        };

        DownloadResult { task, local_path }
    }

    async fn fetch_to(&self, task: &Task, file_path: &LocalPath) -> Result<u64, StoreError> {
        let content = self.source.get(&Path::from(task.source_path())).await?;
        let mut stream = content.into_stream();

        let mut file = tokio::fs::File::create(file_path).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.sync_all().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::ServiceKind;
    use bytes::Bytes;
    use object_store::memory::InMemory;

    const BASE_URL: &str = "https://github.com/DataTalksClub/nyc-tlc-data/releases";

    async fn source_with(task: &Task, body: &'static [u8]) -> Arc<InMemory> {
        let source = Arc::new(InMemory::new());
        source
            .put(&Path::from(task.source_path()), Bytes::from_static(body))
            .await
            .unwrap();
        source
    }

    #[tokio::test]
    async fn fetch_writes_file_named_after_blob() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::new(ServiceKind::Yellow, "2019", "01");
        let source = source_with(&task, b"VendorID,tpep_pickup_datetime\n").await;

        let downloader = Downloader::new(source, BASE_URL, dir.path());
        let result = downloader.fetch(task.clone()).await;

        let local = result.local_path.expect("download should succeed");
        assert_eq!(result.task, task);
        assert!(local.ends_with("yellow_tripdata_2019-01.csv.gz"));
        assert_eq!(
            tokio::fs::read(&local).await.unwrap(),
            b"VendorID,tpep_pickup_datetime\n"
        );
    }

    #[tokio::test]
    async fn missing_asset_yields_no_path_and_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = Task::new(ServiceKind::Green, "2020", "01");
        let missing = Task::new(ServiceKind::Green, "2020", "02");
        let source = source_with(&present, b"x").await;

        let downloader = Downloader::new(source, BASE_URL, dir.path());
        let result = downloader.fetch(missing.clone()).await;

        assert_eq!(result.local_path, None);
        assert!(!dir.path().join(missing.file_name()).exists());
    }

    #[tokio::test]
    async fn unwritable_scratch_dir_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::new(ServiceKind::Yellow, "2020", "07");
        let source = source_with(&task, b"x").await;

        let downloader = Downloader::new(source, BASE_URL, dir.path().join("does-not-exist"));
        let result = downloader.fetch(task).await;

        assert_eq!(result.local_path, None);
    }
}
