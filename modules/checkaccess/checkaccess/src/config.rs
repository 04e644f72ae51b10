//! Configuration for the CheckAccess client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `CHECKACCESS__RETRY__MAX_RETRIES=5`.
pub const ENV_PREFIX: &str = "CHECKACCESS__";

/// Client configuration.
///
/// The credential is not part of it: tokens come from a
/// [`TokenCredential`](checkaccess_sdk::TokenCredential) supplied at construction.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PdpClientConfig {
    /// Full CheckAccess URL, including the `api-version` query.
    pub endpoint: String,

    /// Scope requested from the credential.
    pub scope: String,

    /// Prepended to the `User-Agent` header.
    pub application_id: Option<String>,

    /// Limit for a single attempt. `None` leaves attempts unbounded.
    pub try_timeout_ms: Option<u64>,

    /// Retry policy applied by the request pipeline.
    pub retry: RetryConfig,
}

impl Default for PdpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            scope: String::new(),
            application_id: None,
            try_timeout_ms: None,
            retry: RetryConfig::default(),
        }
    }
}

impl PdpClientConfig {
    /// Load from an optional YAML file, then apply `CHECKACCESS__*` environment overrides.
    ///
    /// # Errors
    ///
    /// - [`ConfigLoadError::NotFound`] if `path` is given but does not exist
    /// - [`ConfigLoadError::Invalid`] if the merged sources do not form a valid config
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigLoadError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigLoadError::Invalid(Box::new(e)))
    }

    #[must_use]
    pub fn try_timeout(&self) -> Option<Duration> {
        self.try_timeout_ms.map(Duration::from_millis)
    }
}

/// Retry policy. Delays grow exponentially from `initial_delay_ms` with jitter,
/// capped at `max_delay_ms`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 800,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    /// Policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Failure to load [`PdpClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_pipeline_expectations() {
        let cfg = PdpClientConfig::default();
        assert!(cfg.endpoint.is_empty());
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.initial_delay(), Duration::from_millis(800));
        assert_eq!(cfg.retry.max_delay(), Duration::from_secs(60));
        assert!(cfg.try_timeout().is_none());
    }

    #[test]
    fn loads_yaml_with_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoint: https://westus.authorization.azure.net/providers/Microsoft.Authorization/checkAccess?api-version=2021-06-01-preview\n\
             scope: https://authorization.azure.net/.default\n\
             try_timeout_ms: 5000\n\
             retry:\n  max_retries: 1"
        )
        .unwrap();

        let cfg = temp_env::with_vars(
            [
                ("CHECKACCESS__APPLICATION_ID", Some("my-rp")),
                ("CHECKACCESS__RETRY__MAX_DELAY_MS", Some("2000")),
            ],
            || PdpClientConfig::load(Some(file.path())),
        )
        .unwrap();

        assert!(cfg.endpoint.ends_with("api-version=2021-06-01-preview"));
        assert_eq!(cfg.scope, "https://authorization.azure.net/.default");
        assert_eq!(cfg.application_id.as_deref(), Some("my-rp"));
        assert_eq!(cfg.try_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.retry.max_retries, 1);
        assert_eq!(cfg.retry.max_delay_ms, 2000);
        assert_eq!(cfg.retry.initial_delay_ms, 800);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = PdpClientConfig::load(Some(Path::new("/nonexistent/checkaccess.yaml")));
        assert!(matches!(result, Err(ConfigLoadError::NotFound(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint: https://pdp\nendpiont: typo").unwrap();

        let result = PdpClientConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigLoadError::Invalid(_))));
    }
}
