//! NATS JetStream relay backend.
//!
//! Publishes wait for the JetStream acknowledgment, so a row is durably
//! stored on the broker before the pipeline moves on to consume it; the
//! consume side therefore reads from the earliest stream offset with no
//! settling pause in between.
//!
//! Each `consume_one` call creates a fresh ephemeral pull consumer (no
//! durable name, no group), fetches at most one message within the bounded
//! wait, acks it, and lets the consumer lapse. One subscription per record
//! keeps messages from bleeding across records at the cost of setup
//! latency.

use crate::domain::model::Row;
use crate::domain::ports::Relay;
use crate::relay::envelope;
use crate::utils::error::{EtlError, Result};
use async_nats::jetstream::{self, consumer::DeliverPolicy};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NatsSettings {
    pub url: String,
    pub stream_name: String,
    pub channel: String,
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream_name: "RELAY_ETL".to_string(),
            channel: "relay-etl.rows".to_string(),
        }
    }
}

pub struct NatsRelay {
    jetstream: jetstream::Context,
    stream: jetstream::stream::Stream,
    channel: String,
}

impl NatsRelay {
    /// Connect to NATS and make sure the backing stream exists.
    pub async fn connect(settings: NatsSettings) -> Result<Self> {
        let client = async_nats::connect(&settings.url)
            .await
            .map_err(|e| EtlError::ConnectionError(e.to_string()))?;
        tracing::info!("Connected to NATS at {}", settings.url);

        let jetstream = jetstream::new(client);

        // Work-queue retention: an acked message leaves the stream, so the
        // fresh consumer a later record creates only ever sees rows that
        // have not completed their round trip.
        let stream = jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: settings.stream_name.clone(),
                subjects: vec![settings.channel.clone()],
                retention: jetstream::stream::RetentionPolicy::WorkQueue,
                storage: jetstream::stream::StorageType::File,
                num_replicas: 1,
                ..Default::default()
            })
            .await
            .map_err(|e| EtlError::ConnectionError(e.to_string()))?;

        tracing::info!("JetStream stream '{}' ready", settings.stream_name);

        Ok(Self {
            jetstream,
            stream,
            channel: settings.channel,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl Relay for NatsRelay {
    async fn publish(&self, row: &[String]) -> Result<Uuid> {
        let message_id = Uuid::new_v4();
        let payload = envelope::encode(&message_id, row)?;

        let ack = self
            .jetstream
            .publish(self.channel.clone(), payload.into())
            .await
            .map_err(|e| EtlError::PublishError {
                channel: self.channel.clone(),
                reason: e.to_string(),
            })?;

        // Durability ack: do not return until the broker has stored the
        // message, not merely buffered it.
        ack.await.map_err(|e| EtlError::PublishError {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            "Published message {} to channel '{}'",
            message_id,
            self.channel
        );
        Ok(message_id)
    }

    async fn consume_one(&self, timeout: Duration) -> Result<(Uuid, Row)> {
        let consumer = self
            .stream
            .create_consumer(jetstream::consumer::pull::Config {
                deliver_policy: DeliverPolicy::All,
                ..Default::default()
            })
            .await
            .map_err(|e| EtlError::ConnectionError(e.to_string()))?;

        let mut batch = consumer
            .fetch()
            .max_messages(1)
            .expires(timeout)
            .messages()
            .await
            .map_err(|e| EtlError::ConnectionError(e.to_string()))?;

        match batch.next().await {
            Some(Ok(message)) => {
                if let Err(e) = message.ack().await {
                    tracing::warn!("Failed to ack consumed message: {}", e);
                }
                envelope::decode(&message.payload)
            }
            Some(Err(e)) => Err(EtlError::ConnectionError(e.to_string())),
            None => Err(EtlError::ConsumeTimeoutError {
                channel: self.channel.clone(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
