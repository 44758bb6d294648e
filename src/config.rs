// =============================================================================
// Engine configuration — hot-reloadable settings with atomic save
// =============================================================================
//
// Generalizes the teacher's `runtime_config.rs` (atomic tmp+rename JSON
// persistence, `#[serde(default)]` on every field) to this engine's own
// tunables: ring capacity, HTTP/WS timeouts, the streaming backoff policy,
// and per-exchange credential placeholders some adapters require even
// though the core only ever calls public endpoints (§4.1).
// =============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_capacity() -> usize {
    150
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_ws_connect_timeout_secs() -> u64 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    30
}

/// Capped-exponential reconnect backoff for the streaming strategy
/// (§4.8/§9 -- a documented divergence from the source's fixed 1s floor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(default = "default_backoff_initial_secs")]
    pub initial_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub max_secs: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_secs: default_backoff_initial_secs(),
            max_secs: default_backoff_max_secs(),
        }
    }
}

/// Placeholder credential pair for adapters that require API keys even for
/// public endpoints. Unused by the core itself -- present purely so an
/// adapter that needs them has somewhere conventional to read them from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeCredentials {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default ring capacity for feeds that do not override it.
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_ws_connect_timeout_secs")]
    pub ws_connect_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default)]
    pub backoff: BackoffPolicy,

    /// Per-exchange credential placeholders, keyed by the registry name.
    #[serde(default)]
    pub credentials: HashMap<String, ExchangeCredentials>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            http_timeout_secs: default_http_timeout_secs(),
            ws_connect_timeout_secs: default_ws_connect_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            backoff: BackoffPolicy::default(),
            credentials: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ws_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_connect_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;
        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(error = %e, "falling back to default engine config"),
            }
        }
        Self::default()
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to a `.tmp` sibling, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_capacity, 150);
        assert_eq!(cfg.backoff.initial_secs, 1);
        assert_eq!(cfg.backoff.max_secs, 30);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.default_capacity, 150);
        assert_eq!(cfg.http_timeout_secs, 10);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "default_capacity": 300 }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_capacity, 300);
        assert_eq!(cfg.ws_connect_timeout_secs, 10);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.default_capacity, cfg2.default_capacity);
        assert_eq!(cfg.backoff.max_secs, cfg2.backoff.max_secs);
    }

    #[test]
    fn load_or_default_falls_back_when_file_missing() {
        let cfg = EngineConfig::load_or_default("/nonexistent/path/engine-config.json");
        assert_eq!(cfg.default_capacity, 150);
    }

    #[test]
    fn save_then_load_round_trips_via_tmp_rename() {
        let dir = std::env::temp_dir().join(format!("candle-feed-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine-config.json");

        let mut cfg = EngineConfig::default();
        cfg.default_capacity = 42;
        cfg.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.default_capacity, 42);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
