//! Core pipeline operations behind the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use vcut_models::{CutRequest, ProcessingStatus, ResultRecord, VideoId};
use vcut_queue::{FinalizeJob, IngestJob, JobBroker, JobHandle, QueueJob};
use vcut_store::StateRepository;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Submits pipeline jobs and reads their outcome from the state store.
#[derive(Clone)]
pub struct PipelineService {
    repo: StateRepository,
    broker: Arc<dyn JobBroker>,
}

impl PipelineService {
    pub fn new(repo: StateRepository, broker: Arc<dyn JobBroker>) -> Self {
        Self { repo, broker }
    }

    pub fn repo(&self) -> &StateRepository {
        &self.repo
    }

    /// Queue the probe of an uploaded file. The worker writes the
    /// `VideoRecord` and status later.
    pub async fn enqueue_ingest(&self, video_id: &VideoId, source_path: PathBuf) -> ApiResult<JobHandle> {
        let job = QueueJob::Ingest(IngestJob::new(video_id.clone(), source_path));
        let handle = self.broker.submit(job).await?;
        metrics::record_job_enqueued("ingest");

        info!(video_id = %video_id, job_id = %handle.job_id, "Ingest job queued");
        Ok(handle)
    }

    /// Current status; `not_found` when nothing is known about the video.
    pub async fn query_status(&self, video_id: &VideoId) -> ApiResult<ProcessingStatus> {
        Ok(self.repo.query_status(video_id).await?)
    }

    /// Queue a finalize job. Nothing is submitted when the cut list is
    /// empty or the video is unknown.
    pub async fn enqueue_finalize(&self, video_id: &VideoId, cuts: Vec<CutRequest>) -> ApiResult<JobHandle> {
        if cuts.is_empty() {
            return Err(ApiError::bad_request("At least one cut is required"));
        }
        if self.repo.get_video(video_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Video {} not found", video_id)));
        }

        let cut_count = cuts.len();
        let job = QueueJob::Finalize(FinalizeJob::new(video_id.clone(), cuts));
        let handle = self.broker.submit(job).await?;
        metrics::record_job_enqueued("finalize");

        info!(
            video_id = %video_id,
            job_id = %handle.job_id,
            "Finalize job queued with {} cuts", cut_count
        );
        Ok(handle)
    }

    /// Result of the last successful finalize, if any.
    pub async fn get_result(&self, video_id: &VideoId) -> ApiResult<Option<ResultRecord>> {
        Ok(self.repo.get_result(video_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vcut_models::{VideoRecord, VideoStatus};
    use vcut_queue::MemoryBroker;
    use vcut_store::MemoryStateStore;

    fn service() -> (PipelineService, Arc<MemoryBroker>) {
        let repo = StateRepository::new(Arc::new(MemoryStateStore::new()), Duration::from_secs(3600));
        let broker = Arc::new(MemoryBroker::new());
        (PipelineService::new(repo, broker.clone()), broker)
    }

    #[tokio::test]
    async fn test_enqueue_ingest_submits_job() {
        let (service, broker) = service();
        let id = VideoId::from("v1");

        let handle = service.enqueue_ingest(&id, "uploads/v1.mp4".into()).await.unwrap();

        let submitted = broker.submitted().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].job_id, handle.job_id);
    }

    #[tokio::test]
    async fn test_finalize_unknown_video_submits_nothing() {
        let (service, broker) = service();

        let err = service
            .enqueue_finalize(&VideoId::from("ghost"), vec![CutRequest::new("0", "5")])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(broker.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_empty_cuts_submits_nothing() {
        let (service, broker) = service();
        let id = VideoId::from("v1");
        service
            .repo()
            .put_video(&VideoRecord::ready(id.clone(), "uploads/v1.mp4", 30.0))
            .await
            .unwrap();

        let err = service.enqueue_finalize(&id, vec![]).await.unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(broker.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_known_video_carries_cuts() {
        let (service, broker) = service();
        let id = VideoId::from("v1");
        service
            .repo()
            .put_video(&VideoRecord::ready(id.clone(), "uploads/v1.mp4", 30.0))
            .await
            .unwrap();

        service
            .enqueue_finalize(&id, vec![CutRequest::new("00:01", "00:04")])
            .await
            .unwrap();

        let delivery = broker.fetch("t", 1, Duration::ZERO).await.unwrap().remove(0);
        match delivery.job() {
            QueueJob::Finalize(job) => {
                assert_eq!(job.video_id, id);
                assert_eq!(job.cuts, vec![CutRequest::new("00:01", "00:04")]);
            }
            other => panic!("unexpected job {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_status_of_unknown_video() {
        let (service, _) = service();
        let status = service.query_status(&VideoId::from("nope")).await.unwrap();
        assert_eq!(status.status, VideoStatus::NotFound);
    }
}
