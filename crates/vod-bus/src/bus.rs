//! Job bus over Redis Streams.

use redis::streams::StreamReadReply;
use tracing::{debug, info, warn};

use crate::error::{BusError, BusResult};
use crate::message::TranscodeJobMessage;
use crate::retry::{retry_async, RetryConfig};

/// Bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for transcode work
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Publish retries before surfacing failure
    pub publish_retries: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vod:transcode".to_string(),
            consumer_group: "vod:workers".to_string(),
            publish_retries: 3,
        }
    }
}

impl BusConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("BUS_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("BUS_CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            publish_retries: std::env::var("BUS_PUBLISH_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.publish_retries),
        }
    }
}

/// One polled message together with its stream id for acking.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry id, passed back to [`JobBus::ack`]
    pub message_id: String,
    /// Decoded work message
    pub message: TranscodeJobMessage,
}

/// Message bus client.
#[derive(Clone)]
pub struct JobBus {
    client: redis::Client,
    config: BusConfig,
}

impl JobBus {
    /// Create a new bus client.
    pub fn new(config: BusConfig) -> BusResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> BusResult<Self> {
        Self::new(BusConfig::from_env())
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn init(&self) -> BusResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(BusError::Redis(e)),
        }

        Ok(())
    }

    /// Publish a work message keyed by job id.
    ///
    /// Transient broker errors are retried internally with backoff; the
    /// stream append is durable by the time this returns `Ok`. Exhausted
    /// retries surface as [`BusError::PublishFailed`] so the dispatcher
    /// can report the submission as unavailable.
    pub async fn publish(&self, message: &TranscodeJobMessage) -> BusResult<String> {
        let payload = serde_json::to_string(message)?;

        let retry = RetryConfig::new("bus_publish").with_max_retries(self.config.publish_retries);

        let entry_id = retry_async(&retry, || {
            let payload = payload.clone();
            async move {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let id: String = redis::cmd("XADD")
                    .arg(&self.config.stream_name)
                    .arg("*")
                    .arg("key")
                    .arg(message.job_id.as_str())
                    .arg("payload")
                    .arg(&payload)
                    .query_async(&mut conn)
                    .await?;
                Ok::<_, redis::RedisError>(id)
            }
        })
        .await
        .map_err(|(e, attempts)| BusError::publish_failed(e.to_string(), attempts))?;

        debug!(
            job_id = %message.job_id,
            entry_id = %entry_id,
            "Published transcode message"
        );
        Ok(entry_id)
    }

    /// Poll for one message with a bounded blocking wait.
    ///
    /// Entries whose payload fails to decode are acked, logged and
    /// skipped; they are never retried. Returns `Ok(None)` when the wait
    /// elapses without a deliverable message.
    pub async fn poll(&self, consumer_name: &str, block_ms: u64) -> BusResult<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(1usize)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                let payload = match entry.map.get("payload") {
                    Some(redis::Value::BulkString(bytes)) => {
                        String::from_utf8_lossy(bytes).into_owned()
                    }
                    _ => {
                        warn!(message_id = %message_id, "Dropping entry without payload field");
                        self.ack(&message_id).await.ok();
                        continue;
                    }
                };

                match serde_json::from_str::<TranscodeJobMessage>(&payload) {
                    Ok(message) => {
                        debug!(job_id = %message.job_id, "Polled transcode message");
                        return Ok(Some(Delivery {
                            message_id,
                            message,
                        }));
                    }
                    Err(e) => {
                        warn!(
                            message_id = %message_id,
                            error = %e,
                            "Dropping malformed transcode message"
                        );
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }

        Ok(None)
    }

    /// Acknowledge a delivered message.
    pub async fn ack(&self, message_id: &str) -> BusResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}
