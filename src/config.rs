//! Portal configuration: named Dataverse environments, table names and logging, loaded from
//! TOML. Every field except an environment's `name` and `base_url` has a default.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [[environments]]
//! name = "production"
//! base_url = "https://racing.crm6.dynamics.com"
//! requests_per_second = 20.0
//! ```

use crate::errors::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A named remote endpoint with its own API version, rate limits, cache and retry policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub name: String,
    pub base_url: String,
    pub api_version: String,
    pub requests_per_second: f64,
    pub burst_capacity: f64,
    pub cooldown_ms: u64,
    pub max_queue_size: usize,
    pub cache_ttl_ms: u64,
    pub cache_max_entries: usize,
    pub persist_cache: bool,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            api_version: "v9.2".to_string(),
            requests_per_second: 10.0,
            burst_capacity: 20.0,
            cooldown_ms: 2_000,
            max_queue_size: 100,
            cache_ttl_ms: 5 * 60 * 1000,
            cache_max_entries: 100,
            persist_cache: false,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl Environment {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { name: name.into(), base_url: base_url.into(), ..Default::default() }
    }

    /// Resource identifier handed to the token provider.
    pub fn resource_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `{base_url}/api/data/{api_version}`
    pub fn api_root(&self) -> String {
        format!("{}/api/data/{}", self.resource_url(), self.api_version)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DataError::Config("environment name must not be empty".into()));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(DataError::Config(format!(
                "environment {}: base_url must be an http(s) URL, got {:?}",
                self.name, self.base_url
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(DataError::Config(format!("environment {}: api_version is empty", self.name)));
        }
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(DataError::Config(format!(
                "environment {}: requests_per_second must be positive",
                self.name
            )));
        }
        if self.cache_max_entries == 0 {
            return Err(DataError::Config(format!(
                "environment {}: cache_max_entries must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// Logical Dataverse table names used by the domain services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub meetings: String,
    pub races: String,
    pub contestants: String,
    pub injuries: String,
    pub weather: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            meetings: "cr616_meetings".to_string(),
            races: "cr616_races".to_string(),
            contestants: "cr616_contestants".to_string(),
            injuries: "cr616_injuries".to_string(),
            weather: "cr616_weatherobservations".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
    pub retention: usize,
    pub dev_trace: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: None, level: "info".to_string(), retention: 7, dev_trace: false }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub environments: Vec<Environment>,
    pub tables: TableNames,
    pub logging: LoggingConfig,
}

impl PortalConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for env in &self.environments {
            env.validate()?;
            if !seen.insert(env.name.as_str()) {
                return Err(DataError::Config(format!("duplicate environment {}", env.name)));
            }
        }
        Ok(())
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| DataError::Config(format!("unknown environment {name}")))
    }
}
