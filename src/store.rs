use std::path::Path as LocalPath;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::{
    gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder},
    http::{HttpBuilder, HttpStore},
    path::Path,
    ClientOptions, ObjectStore,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

/// Size of each chunk handed to the multipart writer. The last one may be shorter.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("access to '{0}' is forbidden")]
    Forbidden(String),
    #[error("unexpected status {status} for '{name}': {body}")]
    Status {
        name: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("storage error: {0}")]
    Storage(#[from] object_store::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two blob operations the uploader needs from the destination bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes the whole local file under `blob`, replacing any previous content.
    async fn put_file(&self, blob: &str, local: &LocalPath) -> Result<u64, StoreError>;

    async fn exists(&self, blob: &str) -> Result<bool, StoreError>;
}

/// [`BlobStore`] backed by any `object_store` implementation.
pub struct ObjectBlobStore {
    store: Arc<dyn ObjectStore>,
    chunk_size: usize,
}

impl ObjectBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put_file(&self, blob: &str, local: &LocalPath) -> Result<u64, StoreError> {
        let location = Path::from(blob);
        let mut file = tokio::fs::File::open(local).await?;

        let (id, mut writer) = self.store.put_multipart(&location).await?;

        match copy_chunks(&mut file, &mut writer, self.chunk_size).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(abort) = self.store.abort_multipart(&location, &id).await {
                    log::warn!("failed to abort upload of {}: {}", blob, abort);
                }
                Err(e.into())
            }
        }
    }

    async fn exists(&self, blob: &str) -> Result<bool, StoreError> {
        match self.store.head(&Path::from(blob)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn copy_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        // a single read may return less than asked for, fill the chunk first
        let mut filled = 0;
        while filled < chunk_size {
            let n = reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            break;
        }
        writer.write_all(&buf[..filled]).await?;
        total += filled as u64;

        if filled < chunk_size {
            break;
        }
    }

    writer.shutdown().await?;
    Ok(total)
}

/// Google Cloud Storage client for `bucket`, credentials taken from the environment.
pub fn gcs(bucket: &str) -> Result<GoogleCloudStorage, StoreError> {
    let store = GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(bucket)
        .build()?;
    Ok(store)
}

/// Read-only store over a plain HTTP(S) release host.
pub fn http(base_url: &str) -> Result<HttpStore, StoreError> {
    let url = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(base_url.to_string(), e))?;

    let store = HttpBuilder::new()
        .with_url(url.as_str().trim_end_matches('/'))
        .with_client_options(ClientOptions::new().with_allow_http(true))
        .build()?;
    Ok(store)
}
