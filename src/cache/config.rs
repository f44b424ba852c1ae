use std::time::Duration;

/// Configuration for one logical cache (one per entity table per environment).
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub max_entries: usize,
    /// Mirror entries to the durable store handed to [`super::Cache::with_store`].
    pub persist: bool,
    /// Namespace for durable keys, e.g. `racedata:prod:races:`.
    pub key_prefix: String,
    /// Background sweep period; `Duration::ZERO` disables the sweeper.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_entries: 100,
            persist: false,
            key_prefix: "racedata:".to_string(),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}
