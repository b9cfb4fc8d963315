use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::bucket::{ensure_bucket, BucketAdmin, ProvisionError};
use crate::download::{DownloadResult, Downloader};
use crate::tasks::Task;
use crate::upload::{UploadOutcome, Uploader};

pub const DEFAULT_WORKERS: usize = 6;

/// Per-run tallies, printed once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub downloaded: usize,
    pub download_failed: usize,
    pub uploaded: usize,
    pub upload_failed: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "downloaded {} ({} failed), uploaded {} ({} failed)",
            self.downloaded, self.download_failed, self.uploaded, self.upload_failed
        )
    }
}

/// Provision, download everything, then upload everything that was downloaded.
pub struct Pipeline {
    admin: Arc<dyn BucketAdmin>,
    bucket: String,
    downloader: Downloader,
    uploader: Uploader,
    workers: usize,
}

impl Pipeline {
    pub fn new(
        admin: Arc<dyn BucketAdmin>,
        bucket: impl Into<String>,
        downloader: Downloader,
        uploader: Uploader,
        workers: usize,
    ) -> Self {
        Self {
            admin,
            bucket: bucket.into(),
            downloader,
            uploader,
            workers: workers.max(1),
        }
    }

    /// Only a provisioning failure aborts the run; per-file failures end up in the report.
    pub async fn run(&self, tasks: Vec<Task>) -> Result<Report, ProvisionError> {
        ensure_bucket(self.admin.as_ref(), &self.bucket).await?;

        let downloads = self.download_all(tasks).await;

        let mut report = Report::default();
        let mut paths = Vec::with_capacity(downloads.len());
        for result in downloads {
            match result.local_path {
                Some(path) => {
                    report.downloaded += 1;
                    paths.push(path);
                }
                None => report.download_failed += 1,
            }
        }

        log::info!(
            "{} of {} downloads succeeded, uploading",
            report.downloaded,
            report.downloaded + report.download_failed
        );

        for outcome in self.upload_all(paths).await {
            if outcome.succeeded {
                report.uploaded += 1;
            } else {
                report.upload_failed += 1;
            }
        }

        Ok(report)
    }

    /// Returns once every task has finished, in completion order.
    pub async fn download_all(&self, tasks: Vec<Task>) -> Vec<DownloadResult> {
        stream::iter(tasks)
            .map(|task| self.downloader.fetch(task))
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    pub async fn upload_all(&self, paths: Vec<std::path::PathBuf>) -> Vec<UploadOutcome> {
        stream::iter(paths)
            .map(|path| async move { self.uploader.upload(&path).await })
            .buffer_unordered(self.workers)
            .collect()
            .await
    }
}
