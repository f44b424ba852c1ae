use std::time::Duration;

/// Per-call overrides for the read operations of [`super::EntityService`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Skip the cache lookup. The fetched result still refreshes the cache.
    pub bypass_cache: bool,
    /// TTL for the cached result instead of the environment default.
    pub ttl: Option<Duration>,
}

impl CallOptions {
    pub fn fresh() -> Self {
        Self { bypass_cache: true, ttl: None }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { bypass_cache: false, ttl: Some(ttl) }
    }
}
