//! Key/value store seam.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreResult;

/// Atomic per-key operations. Nothing spans more than one key.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value`, replacing any previous value, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Check the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
