use async_trait::async_trait;
use object_store::gcp::GcpCredentialProvider;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::store::StoreError;

pub const GCS_API_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";

/// Bucket-level operations needed before any upload can start.
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    /// Ok when the bucket exists and is readable, [`StoreError::NotFound`] or
    /// [`StoreError::Forbidden`] for the two expected failure modes.
    async fn lookup(&self, bucket: &str) -> Result<(), StoreError>;

    async fn create(&self, bucket: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Existing,
    Created,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Bucket '{0}' exists but is not accessible.")]
    Forbidden(String),
    #[error("Failed to look up bucket '{bucket}': {source}")]
    Lookup {
        bucket: String,
        #[source]
        source: StoreError,
    },
    #[error("Failed to create bucket '{bucket}': {source}")]
    Create {
        bucket: String,
        #[source]
        source: StoreError,
    },
}

/// Makes sure `bucket` exists, creating it if needed. Safe to call repeatedly.
pub async fn ensure_bucket(
    admin: &dyn BucketAdmin,
    bucket: &str,
) -> Result<Provisioned, ProvisionError> {
    match admin.lookup(bucket).await {
        Ok(()) => {
            log::info!("Bucket '{}' exists.", bucket);
            Ok(Provisioned::Existing)
        }
        Err(StoreError::NotFound(_)) => {
            admin
                .create(bucket)
                .await
                .map_err(|source| ProvisionError::Create {
                    bucket: bucket.to_string(),
                    source,
                })?;
            log::info!("Created bucket '{}'", bucket);
            Ok(Provisioned::Created)
        }
        Err(StoreError::Forbidden(_)) => {
            log::error!("Bucket '{}' exists but is not accessible.", bucket);
            Err(ProvisionError::Forbidden(bucket.to_string()))
        }
        Err(source) => Err(ProvisionError::Lookup {
            bucket: bucket.to_string(),
            source,
        }),
    }
}

/// [`BucketAdmin`] speaking the GCS JSON API with the credentials of an
/// `object_store` GCS client.
pub struct GcsBucketAdmin {
    client: Client,
    credentials: GcpCredentialProvider,
    project_id: String,
    endpoint: String,
}

impl GcsBucketAdmin {
    pub fn new(credentials: GcpCredentialProvider, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            project_id: project_id.into(),
            endpoint: GCS_API_ENDPOINT.to_string(),
        }
    }

    /// Points the admin at another JSON API root, e.g. a local emulator.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        let credential = self.credentials.get_credential().await?;
        Ok(credential.bearer.clone())
    }
}

#[async_trait]
impl BucketAdmin for GcsBucketAdmin {
    async fn lookup(&self, bucket: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .get(format!("{}/b/{}", self.endpoint, bucket))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(status_error(bucket, status, response).await),
        }
    }

    async fn create(&self, bucket: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!("{}/b", self.endpoint))
            .query(&[("project", self.project_id.as_str())])
            .bearer_auth(self.bearer().await?)
            .json(&serde_json::json!({ "name": bucket }))
            .send()
            .await?;

        match response.status() {
            // someone else created it between lookup and create
            status if status.is_success() || status == StatusCode::CONFLICT => Ok(()),
            status => Err(status_error(bucket, status, response).await),
        }
    }
}

async fn status_error(
    bucket: &str,
    status: StatusCode,
    response: reqwest::Response,
) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(bucket.to_string()),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            StoreError::Forbidden(bucket.to_string())
        }
        _ => StoreError::Status {
            name: bucket.to_string(),
            status,
            body: response.text().await.unwrap_or_default(),
        },
    }
}
