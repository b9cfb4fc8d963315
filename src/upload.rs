use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::store::BlobStore;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fixed-delay retry policy for uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on upload attempts per file, first attempt included.
    pub max_retries: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub blob_name: String,
    pub succeeded: bool,
    pub attempts_used: u32,
}

/// Blob name for a downloaded file: its base name, unchanged.
pub fn blob_name(local_path: &Path) -> Option<String> {
    local_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

pub struct Uploader {
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    policy: RetryPolicy,
}

impl Uploader {
    pub fn new(blobs: Arc<dyn BlobStore>, bucket: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            blobs,
            bucket: bucket.into(),
            policy,
        }
    }

    /// Uploads `local_path` and checks the blob is there afterwards, retrying both
    /// steps together. A file that never verifies is reported, not propagated.
    pub async fn upload(&self, local_path: &Path) -> UploadOutcome {
        let Some(blob_name) = blob_name(local_path) else {
            log::error!("Cannot derive a blob name from {}", local_path.display());
            return UploadOutcome {
                blob_name: local_path.display().to_string(),
                succeeded: false,
                attempts_used: 0,
            };
        };

        let max_retries = self.policy.max_retries;

        for attempt in 1..=max_retries {
            log::info!(
                "Uploading {} to {} (Attempt {})...",
                local_path.display(),
                self.bucket,
                attempt
            );

            match self.blobs.put_file(&blob_name, local_path).await {
                Ok(written) => {
                    log::info!("Uploaded: gs://{}/{}", self.bucket, blob_name);
                    log::debug!("{} bytes sent for {}", written, blob_name);

                    match self.blobs.exists(&blob_name).await {
                        Ok(true) => {
                            log::info!("Verification successful for {}", blob_name);
                            return UploadOutcome {
                                blob_name,
                                succeeded: true,
                                attempts_used: attempt,
                            };
                        }
                        Ok(false) => {
                            log::warn!("Verification failed for {}, retrying...", blob_name)
                        }
                        Err(e) => log::warn!("Verification of {} failed: {}", blob_name, e),
                    }
                }
                Err(e) => log::warn!("Upload failed for {}: {}", blob_name, e),
            }

            if attempt < max_retries {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        log::error!(
            "Giving up on {} after {} attempts.",
            local_path.display(),
            max_retries
        );

        UploadOutcome {
            blob_name,
            succeeded: false,
            attempts_used: max_retries,
        }
    }
}
