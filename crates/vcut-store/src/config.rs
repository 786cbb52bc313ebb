//! Store configuration.

use std::time::Duration;

/// Default lifetime of every stored record.
pub const DEFAULT_STATE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Expiry applied to every write
    pub state_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
            state_ttl: Duration::from_secs(
                std::env::var("STATE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_STATE_TTL_SECS),
            ),
        }
    }
}
