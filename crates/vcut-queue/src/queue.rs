//! Job queue using Redis Streams.
//!
//! Layout:
//! - `stream_name`: live jobs, read through a consumer group
//! - `delayed_set`: sorted set of envelopes scored by their due time (ms)
//! - `dlq_stream_name`: jobs that exhausted their attempts

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::broker::JobBroker;
use crate::error::{QueueError, QueueResult};
use crate::job::{Delivery, JobEnvelope, JobHandle, QueueJob};

/// Due retries promoted per call.
const PROMOTE_BATCH: usize = 100;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Sorted set holding scheduled retries
    pub delayed_set: String,
    /// Retries after the first attempt before a job is dead-lettered
    pub max_retries: u32,
    /// Delay before a retry becomes visible
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            stream_name: "vcut:jobs".to_string(),
            consumer_group: "vcut:workers".to_string(),
            dlq_stream_name: "vcut:dlq".to_string(),
            delayed_set: "vcut:jobs:delayed".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            delayed_set: std::env::var("QUEUE_DELAYED_SET").unwrap_or(defaults.delayed_set),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: std::env::var("QUEUE_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
        }
    }
}

/// Job queue client.
#[derive(Clone)]
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn push(&self, envelope: &JobEnvelope) -> QueueResult<String> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(envelope)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("job_id")
            .arg(envelope.job.job_id().as_str())
            .query_async(&mut conn)
            .await?;

        Ok(message_id)
    }

    /// Decode stream entries, acking any that cannot be parsed so they are
    /// not redelivered forever.
    async fn decode_entries(&self, entries: Vec<redis::streams::StreamId>) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(entries.len());

        for entry in entries {
            let message_id = entry.id.clone();
            let payload: Option<String> = entry.get("job");

            match payload.map(|p| serde_json::from_str::<JobEnvelope>(&p)) {
                Some(Ok(envelope)) => {
                    debug!("Consumed job {} from stream", envelope.job.job_id());
                    deliveries.push(Delivery {
                        message_id,
                        envelope,
                    });
                }
                Some(Err(e)) => {
                    warn!("Failed to parse job payload {}: {}", message_id, e);
                    self.ack(&message_id).await.ok();
                }
                None => {
                    warn!("Stream entry {} has no job field", message_id);
                    self.ack(&message_id).await.ok();
                }
            }
        }

        deliveries
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Number of scheduled retries.
    pub async fn delayed_len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.zcard(&self.config.delayed_set).await?;
        Ok(len)
    }
}

#[async_trait]
impl JobBroker for JobQueue {
    /// Create the consumer group if it does not exist.
    async fn init(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    async fn submit(&self, job: QueueJob) -> QueueResult<JobHandle> {
        let job_id = job.job_id().clone();
        let kind = job.kind();
        let message_id = self.push(&JobEnvelope::first(job)).await?;

        info!("Enqueued {} job {} with message ID {}", kind, job_id, message_id);

        Ok(JobHandle { job_id, message_id })
    }

    async fn fetch(&self, consumer: &str, max: usize, block: Duration) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;

        let reply: Option<redis::streams::StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg("COUNT")
            .arg(max)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();

        Ok(self.decode_entries(entries).await)
    }

    /// Acknowledge and delete the stream entry.
    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    async fn retry_later(&self, delivery: &Delivery, delay: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let next = delivery.envelope.next_attempt();
        let payload = serde_json::to_string(&next)?;
        let due_ms = chrono::Utc::now().timestamp_millis() + delay.as_millis() as i64;

        // Schedule before acking so a crash in between duplicates rather than loses the job.
        conn.zadd::<_, _, _, ()>(&self.config.delayed_set, &payload, due_ms)
            .await?;
        self.ack(&delivery.message_id).await?;

        info!(
            "Scheduled retry {} of job {} in {}s",
            next.attempt,
            next.job.job_id(),
            delay.as_secs()
        );
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let payload = serde_json::to_string(&delivery.envelope)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(&delivery.message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(&delivery.message_id).await?;

        warn!("Moved job {} to DLQ: {}", delivery.job().job_id(), error);
        Ok(())
    }

    async fn reclaim_stalled(
        &self,
        consumer: &str,
        min_idle: Duration,
        max: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;
        let min_idle_ms = min_idle.as_millis() as u64;

        let pending: redis::streams::StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(max)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(min_idle_ms);
        for p in &pending.ids {
            cmd.arg(&p.id);
        }

        // Entries another worker claimed first are simply absent from the reply.
        let claimed: redis::streams::StreamClaimReply = cmd.query_async(&mut conn).await?;

        let deliveries = self.decode_entries(claimed.ids).await;
        for d in &deliveries {
            info!("Claimed stalled job {} ({})", d.job().job_id(), d.message_id);
        }
        Ok(deliveries)
    }

    async fn promote_due(&self) -> QueueResult<usize> {
        let mut conn = self.conn().await?;
        let now_ms = chrono::Utc::now().timestamp_millis();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.config.delayed_set)
            .arg("-inf")
            .arg(now_ms)
            .arg("LIMIT")
            .arg(0)
            .arg(PROMOTE_BATCH)
            .query_async(&mut conn)
            .await?;

        let mut promoted = 0;
        for payload in due {
            // Only the worker that removes the member gets to promote it.
            let removed: i64 = conn.zrem(&self.config.delayed_set, &payload).await?;
            if removed == 0 {
                continue;
            }

            match serde_json::from_str::<JobEnvelope>(&payload) {
                Ok(envelope) => {
                    self.push(&envelope).await?;
                    promoted += 1;
                }
                Err(e) => warn!("Dropping unparseable delayed job: {}", e),
            }
        }

        if promoted > 0 {
            debug!("Promoted {} delayed jobs", promoted);
        }
        Ok(promoted)
    }
}
