//! Run configuration loaded from YAML.
//!
//! ```yaml
//! cluster:
//!   org: acme
//!   cluster: prod-cassandra
//! axonops:
//!   api_url: https://axonops.example.com
//!   token: ""            # falls back to AXONOPS_API_TOKEN
//! analysis:
//!   hours: 24
//!   enable_sections:
//!     security: false
//!   thresholds:
//!     cpu_usage_warn: 75.0
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Environment variable consulted when the file carries no API token.
pub const TOKEN_ENV_VAR: &str = "AXONOPS_API_TOKEN";

/// Which cluster to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default = "default_cluster_type")]
    pub cluster_type: String,
}

fn default_cluster_type() -> String {
    "cassandra".to_string()
}

/// How to reach the AxonOps API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxonOpsConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_api_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

impl Default for AxonOpsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: String::new(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Numeric knobs the analyzers compare against. Comparisons are strict `>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_usage_warn: f64,
    pub memory_usage_warn: f64,
    pub disk_usage_warn: f64,
    pub heap_usage_warn: f64,
    pub gc_pause_warn_ms: i64,
    pub gc_pause_critical_ms: i64,
    pub dropped_messages_warn: i64,
    pub dropped_messages_critical: i64,
    pub pending_compactions_warn: i64,
    pub pending_compactions_critical: i64,
    pub blocked_tasks_warn: i64,
    pub sstables_per_read_warn: i64,
    pub partition_size_warn_mb: i64,
    pub partition_size_critical_mb: i64,
    pub tombstone_ratio_warn: f64,
    pub min_replication_factor: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_usage_warn: 80.0,
            memory_usage_warn: 85.0,
            disk_usage_warn: 80.0,
            heap_usage_warn: 75.0,
            gc_pause_warn_ms: 200,
            gc_pause_critical_ms: 1000,
            dropped_messages_warn: 1000,
            dropped_messages_critical: 10000,
            pending_compactions_warn: 100,
            pending_compactions_critical: 1000,
            blocked_tasks_warn: 1,
            sstables_per_read_warn: 4,
            partition_size_warn_mb: 100,
            partition_size_critical_mb: 1000,
            tombstone_ratio_warn: 0.1,
            min_replication_factor: 3,
        }
    }
}

/// Analysis window, enabled sections and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub hours: u32,
    pub metrics_resolution_seconds: u32,
    /// Section name to enabled flag. Sections missing from the map use
    /// [`AnalysisConfig::DEFAULT_SECTIONS`].
    pub enable_sections: BTreeMap<String, bool>,
    pub thresholds: Thresholds,
}

impl AnalysisConfig {
    pub const DEFAULT_SECTIONS: [&'static str; 6] = [
        "infrastructure",
        "configuration",
        "operations",
        "operations_logs",
        "datamodel",
        "security",
    ];

    pub fn is_section_enabled(&self, section: &str) -> bool {
        self.enable_sections
            .get(section)
            .copied()
            .unwrap_or_else(|| Self::DEFAULT_SECTIONS.contains(&section))
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hours: 24,
            metrics_resolution_seconds: 60,
            enable_sections: Self::DEFAULT_SECTIONS
                .iter()
                .map(|s| (s.to_string(), true))
                .collect(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub axonops: AxonOpsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Loads and validates a YAML configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the YAML document
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if validation fails.
    /// An empty `axonops.token` is filled from `AXONOPS_API_TOKEN` before validation.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!("Loaded configuration, path={}", path.as_ref().display());
        Self::from_yaml_str(&content, std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Parses a YAML document, applying `env_token` when the file has no token.
    pub fn from_yaml_str(content: &str, env_token: Option<String>) -> ConfigResult<Self> {
        let mut config: AppConfig = serde_yaml::from_str(content)?;
        if config.axonops.token.trim().is_empty() {
            if let Some(token) = env_token {
                config.axonops.token = token;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks required fields and value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cluster.org.trim().is_empty() {
            return Err(ConfigError::MissingField("cluster.org".to_string()));
        }
        if self.cluster.cluster.trim().is_empty() {
            return Err(ConfigError::MissingField("cluster.cluster".to_string()));
        }
        if self.axonops.api_url.trim().is_empty() {
            return Err(ConfigError::MissingField("axonops.api_url".to_string()));
        }
        Url::parse(&self.axonops.api_url).map_err(|e| {
            ConfigError::Invalid(format!("axonops.api_url '{}': {}", self.axonops.api_url, e))
        })?;
        if self.axonops.token.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "axonops.token (set it in the config file or the {} environment variable)",
                TOKEN_ENV_VAR
            )));
        }
        if self.analysis.hours == 0 {
            return Err(ConfigError::Invalid(
                "analysis.hours must be positive".to_string(),
            ));
        }
        if self.analysis.metrics_resolution_seconds == 0 {
            return Err(ConfigError::Invalid(
                "analysis.metrics_resolution_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
cluster:
  org: acme
  cluster: prod
axonops:
  token: secret
";

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml_str(MINIMAL, None).unwrap();

        assert_eq!(config.cluster.cluster_type, "cassandra");
        assert_eq!(config.axonops.api_url, "http://localhost:9090");
        assert_eq!(config.axonops.timeout, 30);
        assert_eq!(config.axonops.max_retries, 3);
        assert_eq!(config.analysis.hours, 24);
        assert_eq!(config.analysis.metrics_resolution_seconds, 60);
        assert_eq!(config.analysis.thresholds, Thresholds::default());
        assert!(config.analysis.is_section_enabled("security"));
        assert!(config.analysis.is_section_enabled("operations_logs"));
    }

    #[test]
    fn test_partial_overrides() {
        let yaml = "
cluster:
  org: acme
  cluster: prod
axonops:
  token: secret
analysis:
  hours: 6
  enable_sections:
    security: false
  thresholds:
    cpu_usage_warn: 70.0
    min_replication_factor: 2
";
        let config = AppConfig::from_yaml_str(yaml, None).unwrap();
        assert_eq!(config.analysis.hours, 6);
        assert!(!config.analysis.is_section_enabled("security"));
        // sections missing from a user supplied map still default on
        assert!(config.analysis.is_section_enabled("infrastructure"));
        assert!(!config.analysis.is_section_enabled("something_else"));
        assert_eq!(config.analysis.thresholds.cpu_usage_warn, 70.0);
        assert_eq!(config.analysis.thresholds.min_replication_factor, 2);
        assert_eq!(config.analysis.thresholds.memory_usage_warn, 85.0);
    }

    #[test]
    fn test_token_from_environment() {
        let yaml = "
cluster:
  org: acme
  cluster: prod
";
        let config = AppConfig::from_yaml_str(yaml, Some("env-token".to_string())).unwrap();
        assert_eq!(config.axonops.token, "env-token");
    }

    #[test]
    fn test_file_token_wins_over_environment() {
        let config = AppConfig::from_yaml_str(MINIMAL, Some("env-token".to_string())).unwrap();
        assert_eq!(config.axonops.token, "secret");
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let yaml = "
cluster:
  org: acme
  cluster: prod
";
        match AppConfig::from_yaml_str(yaml, None) {
            Err(ConfigError::MissingField(field)) => assert!(field.contains("axonops.token")),
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_org_is_fatal() {
        let yaml = "
cluster:
  cluster: prod
axonops:
  token: secret
";
        assert!(matches!(
            AppConfig::from_yaml_str(yaml, None),
            Err(ConfigError::MissingField(f)) if f == "cluster.org"
        ));
    }

    #[test]
    fn test_invalid_url_is_fatal() {
        let yaml = "
cluster:
  org: acme
  cluster: prod
axonops:
  api_url: not a url
  token: secret
";
        assert!(matches!(
            AppConfig::from_yaml_str(yaml, None),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.cluster.org, "acme");

        let missing = AppConfig::from_file(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ConfigError::IoError(_))));
    }
}
