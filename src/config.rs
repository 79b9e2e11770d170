//! Engine configuration types and loading (SPEC_FULL §D).

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub adapter: AdapterConfig,
    pub concurrency: ConcurrencyConfig,
    pub storage: StorageConfig,
    pub subsession: SubSessionConfig,
}

impl Config {
    /// Load with fallback chain: explicit path, then `.swarmhost.yml` in the
    /// cwd, then `~/.config/swarmhost/swarmhost.yml`, then defaults. A parse
    /// failure on a candidate is logged as a warning and the chain
    /// continues rather than aborting.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".swarmhost.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("failed to load config from {}: {}", local_config.display(), e),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("swarmhost").join("swarmhost.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("failed to load config from {}: {}", user_config.display(), e),
                }
            }
        }

        tracing::info!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("failed to parse config file")?;
        tracing::info!("loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Host discovery and adapter RPC timeouts (spec §4.1, §5 "Timeouts").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    #[serde(rename = "discovery-url")]
    pub discovery_url: String,
    #[serde(rename = "product-marker")]
    pub product_marker: String,
    #[serde(rename = "evaluate-timeout-ms")]
    pub evaluate_timeout_ms: u64,
    #[serde(rename = "discovery-timeout-ms")]
    pub discovery_timeout_ms: u64,
    #[serde(rename = "list-sessions-ttl-ms")]
    pub list_sessions_ttl_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            discovery_url: "http://127.0.0.1:9876/json/list".to_string(),
            product_marker: "swarmhost".to_string(),
            evaluate_timeout_ms: 30_000,
            discovery_timeout_ms: 5_000,
            list_sessions_ttl_ms: 2_000,
        }
    }
}

/// Defaults used when a template omits its own concurrency knobs
/// (spec §3 "Template").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    #[serde(rename = "max-workers")]
    pub max_workers: u32,
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
    #[serde(rename = "worker-timeout-ms")]
    pub worker_timeout_ms: u64,
    #[serde(rename = "retry-max")]
    pub retry_max: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1_000,
            worker_timeout_ms: 10 * 60 * 1_000,
            retry_max: 1,
        }
    }
}

/// On-disk layout for templates and orchestrator state (spec §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "templates-dir")]
    pub templates_dir: PathBuf,
    #[serde(rename = "orchestrator-state-path")]
    pub orchestrator_state_path: PathBuf,
    #[serde(rename = "persistence-debounce-ms")]
    pub persistence_debounce_ms: u64,
    #[serde(rename = "shutdown-timeout-secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("swarmhost");
        Self {
            templates_dir: base.join("templates").join("custom"),
            orchestrator_state_path: base.join("orchestrator").join("data").join("orchestrators.json"),
            persistence_debounce_ms: 1_000,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Idle/orphan thresholds for `SubSessionTracker` (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubSessionConfig {
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
    #[serde(rename = "idle-threshold-ms")]
    pub idle_threshold_ms: u64,
    #[serde(rename = "orphan-threshold-ms")]
    pub orphan_threshold_ms: u64,
    #[serde(rename = "forward-results")]
    pub forward_results: bool,
}

impl Default for SubSessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            idle_threshold_ms: 15_000,
            orphan_threshold_ms: 60_000,
            forward_results: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.concurrency.max_workers, 4);
        assert_eq!(config.subsession.idle_threshold_ms, 15_000);
        assert_eq!(config.subsession.orphan_threshold_ms, 60_000);
        assert!(config.subsession.forward_results);
    }

    #[test]
    fn deserialize_partial_config_uses_defaults() {
        let yaml = r#"
concurrency:
  max-workers: 8
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.concurrency.max_workers, 8);
        assert_eq!(config.concurrency.retry_max, 1);
        assert_eq!(config.adapter.evaluate_timeout_ms, 30_000);
    }

    #[test]
    fn deserialize_full_config() {
        let yaml = r#"
adapter:
  discovery-url: "http://localhost:1234/json/list"
  product-marker: "myhost"
  evaluate-timeout-ms: 15000
  discovery-timeout-ms: 3000
  list-sessions-ttl-ms: 1000

concurrency:
  max-workers: 2
  poll-interval-ms: 500
  worker-timeout-ms: 60000
  retry-max: 3

storage:
  templates-dir: "/tmp/templates"
  orchestrator-state-path: "/tmp/orchestrators.json"
  persistence-debounce-ms: 250
  shutdown-timeout-secs: 5

subsession:
  poll-interval-ms: 1000
  idle-threshold-ms: 5000
  orphan-threshold-ms: 20000
  forward-results: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.adapter.product_marker, "myhost");
        assert_eq!(config.concurrency.max_workers, 2);
        assert_eq!(config.storage.persistence_debounce_ms, 250);
        assert!(!config.subsession.forward_results);
    }
}
