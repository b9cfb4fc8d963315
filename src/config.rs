use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::DEFAULT_WORKERS;
use crate::tasks::TaskSet;
use crate::upload::RetryPolicy;

pub const BUCKET_VAR: &str = "GCS_BUCKET";
pub const PROJECT_VAR: &str = "GCP_PROJECT_ID";

pub const DEFAULT_BASE_URL: &str = "https://github.com/DataTalksClub/nyc-tlc-data/releases";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ERROR: {0} environment variable not set.")]
    MissingVar(&'static str),
}

/// Everything the run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bucket: String,
    pub project_id: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub tasks: TaskSet,
}

impl Settings {
    /// Reads the required variables through `lookup`, leaving every other field at its default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        Ok(Self {
            bucket: required(BUCKET_VAR)?,
            project_id: required(PROJECT_VAR)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
            tasks: TaskSet::default(),
        })
    }

    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn both_vars_present() {
        let settings =
            Settings::from_lookup(lookup(&[(BUCKET_VAR, "nyc-trips"), (PROJECT_VAR, "proj-1")]))
                .unwrap();

        assert_eq!(settings.bucket, "nyc-trips");
        assert_eq!(settings.project_id, "proj-1");
        assert_eq!(settings.workers, 6);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_bucket_is_reported_first() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();

        assert_eq!(err, ConfigError::MissingVar(BUCKET_VAR));
        assert_eq!(err.to_string(), "ERROR: GCS_BUCKET environment variable not set.");
    }

    #[test]
    fn blank_project_counts_as_missing() {
        let err = Settings::from_lookup(lookup(&[(BUCKET_VAR, "b"), (PROJECT_VAR, "  ")]))
            .unwrap_err();

        assert_eq!(err, ConfigError::MissingVar(PROJECT_VAR));
    }
}
