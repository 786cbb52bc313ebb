//! Typed access to pipeline state.
//!
//! Every write replaces the whole value and resets the key's expiry. There is
//! no transaction across keys, so a crash between two writes leaves the state
//! as of the last completed write.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vcut_models::{ChatSession, ProcessingStatus, ResultRecord, VideoId, VideoRecord};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::keys::{chat_history_key, video_info_key, video_result_key, video_status_key};
use crate::store::StateStore;

/// Typed repository over a `StateStore`.
#[derive(Clone)]
pub struct StateRepository {
    store: Arc<dyn StateStore>,
    ttl: Duration,
}

impl StateRepository {
    pub fn new(store: Arc<dyn StateStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn with_config(store: Arc<dyn StateStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.state_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_ex(key, &raw, self.ttl).await
    }

    pub async fn get_video(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        self.read(&video_info_key(id)).await
    }

    pub async fn put_video(&self, record: &VideoRecord) -> StoreResult<()> {
        self.write(&video_info_key(&record.id), record).await
    }

    /// The stored status value, if any.
    pub async fn get_status(&self, id: &VideoId) -> StoreResult<Option<ProcessingStatus>> {
        self.read(&video_status_key(id)).await
    }

    pub async fn put_status(&self, id: &VideoId, status: &ProcessingStatus) -> StoreResult<()> {
        debug!(video_id = %id, status = %status.status, "Writing status");
        self.write(&video_status_key(id), status).await
    }

    /// Status as seen by callers.
    ///
    /// Falls back to the video record's own status when no status key
    /// exists, and to `not_found` when neither exists.
    pub async fn query_status(&self, id: &VideoId) -> StoreResult<ProcessingStatus> {
        if let Some(status) = self.get_status(id).await? {
            return Ok(status);
        }
        match self.get_video(id).await? {
            Some(record) => Ok(ProcessingStatus::new(record.status, "Video ready for editing")),
            None => Ok(ProcessingStatus::not_found()),
        }
    }

    pub async fn get_chat(&self, id: &VideoId) -> StoreResult<Option<ChatSession>> {
        self.read(&chat_history_key(id)).await
    }

    pub async fn put_chat(&self, id: &VideoId, session: &ChatSession) -> StoreResult<()> {
        self.write(&chat_history_key(id), session).await
    }

    pub async fn get_result(&self, id: &VideoId) -> StoreResult<Option<ResultRecord>> {
        self.read(&video_result_key(id)).await
    }

    pub async fn put_result(&self, result: &ResultRecord) -> StoreResult<()> {
        self.write(&video_result_key(&result.video_id), result).await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStateStore;
    use vcut_models::VideoStatus;

    fn repo() -> (Arc<MemoryStateStore>, StateRepository) {
        let store = Arc::new(MemoryStateStore::new());
        let repo = StateRepository::new(store.clone(), Duration::from_secs(60));
        (store, repo)
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let (_, repo) = repo();
        let status = repo.query_status(&VideoId::from("missing")).await.unwrap();
        assert_eq!(status.status, VideoStatus::NotFound);
    }

    #[tokio::test]
    async fn test_video_without_status_key_is_ready() {
        let (_, repo) = repo();
        let id = VideoId::from("v1");
        repo.put_video(&VideoRecord::ready(id.clone(), "uploads/v1.mp4", 12.0))
            .await
            .unwrap();

        let status = repo.query_status(&id).await.unwrap();
        assert_eq!(status.status, VideoStatus::Ready);
    }

    #[tokio::test]
    async fn test_status_key_wins_and_is_overwritten() {
        let (_, repo) = repo();
        let id = VideoId::from("v1");
        repo.put_video(&VideoRecord::ready(id.clone(), "uploads/v1.mp4", 12.0))
            .await
            .unwrap();
        repo.put_status(&id, &ProcessingStatus::processing("Cutting video"))
            .await
            .unwrap();
        repo.put_status(&id, &ProcessingStatus::error("boom")).await.unwrap();

        let status = repo.query_status(&id).await.unwrap();
        assert_eq!(status, ProcessingStatus::error("boom"));
    }

    #[tokio::test]
    async fn test_keys_use_expected_shapes() {
        let (store, repo) = repo();
        let id = VideoId::from("abc");
        repo.put_result(&ResultRecord::completed(id.clone(), "processed/abc_final.mp4", 2))
            .await
            .unwrap();
        repo.put_chat(&id, &ChatSession::default()).await.unwrap();

        assert!(store.get("video_result:abc").await.unwrap().is_some());
        assert!(store.get("chat_history:abc").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_value_is_reported() {
        let (store, repo) = repo();
        store
            .set_ex("video_info:bad", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let result = repo.get_video(&VideoId::from("bad")).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
