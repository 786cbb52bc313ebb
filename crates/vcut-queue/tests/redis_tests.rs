//! Round trips against a live Redis server.
//!
//! Run with `REDIS_URL=redis://localhost:6379/15 cargo test -p vcut-queue -- --ignored`.

use std::time::Duration;

use vcut_models::VideoId;
use vcut_queue::{IngestJob, JobBroker, JobQueue, QueueConfig, QueueJob};

fn test_queue() -> JobQueue {
    let suffix = uuid::Uuid::new_v4();
    let config = QueueConfig {
        stream_name: format!("vcut:test:{}:jobs", suffix),
        consumer_group: format!("vcut:test:{}:workers", suffix),
        dlq_stream_name: format!("vcut:test:{}:dlq", suffix),
        delayed_set: format!("vcut:test:{}:delayed", suffix),
        ..QueueConfig::from_env()
    };
    JobQueue::new(config).unwrap()
}

fn ingest() -> QueueJob {
    QueueJob::Ingest(IngestJob::new(VideoId::new(), "uploads/test.mp4"))
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn submit_fetch_ack() {
    let queue = test_queue();
    queue.init().await.unwrap();

    let handle = queue.submit(ingest()).await.unwrap();
    let jobs = queue.fetch("w1", 10, Duration::from_millis(100)).await.unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].message_id, handle.message_id);
    assert_eq!(jobs[0].job().job_id(), &handle.job_id);

    queue.ack(&handle.message_id).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn retry_goes_through_delayed_set() {
    let queue = test_queue();
    queue.init().await.unwrap();

    queue.submit(ingest()).await.unwrap();
    let delivery = queue
        .fetch("w1", 1, Duration::from_millis(100))
        .await
        .unwrap()
        .remove(0);

    queue.retry_later(&delivery, Duration::ZERO).await.unwrap();
    assert_eq!(queue.delayed_len().await.unwrap(), 1);

    assert_eq!(queue.promote_due().await.unwrap(), 1);
    let retried = queue
        .fetch("w1", 1, Duration::from_millis(100))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(retried.attempt(), 1);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn stalled_entry_is_claimed_by_another_consumer() {
    let queue = test_queue();
    queue.init().await.unwrap();

    queue.submit(ingest()).await.unwrap();
    let delivery = queue
        .fetch("crashed", 1, Duration::from_millis(100))
        .await
        .unwrap()
        .remove(0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let claimed = queue
        .reclaim_stalled("survivor", Duration::from_millis(10), 10)
        .await
        .unwrap();

    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].message_id, delivery.message_id);

    queue.dead_letter(&claimed[0], "gave up").await.unwrap();
    assert_eq!(queue.dlq_len().await.unwrap(), 1);
}
