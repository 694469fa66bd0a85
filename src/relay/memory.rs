//! In-process relay backend.
//!
//! A long-lived queue pair replaces the per-record broker subscription:
//! publish enqueues the encoded envelope, consume dequeues with a bounded
//! wait. Same envelope and identifier scheme as the broker backend, so
//! the pipeline cannot tell the two apart.

use crate::domain::model::Row;
use crate::domain::ports::Relay;
use crate::relay::envelope;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

pub struct MemoryRelay {
    channel: String,
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryRelay {
    pub fn new(channel: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            channel: channel.into(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn publish(&self, row: &[String]) -> Result<Uuid> {
        let message_id = Uuid::new_v4();
        let payload = envelope::encode(&message_id, row)?;

        self.sender
            .send(payload)
            .map_err(|_| EtlError::PublishError {
                channel: self.channel.clone(),
                reason: "in-process channel is closed".to_string(),
            })?;

        tracing::debug!(
            "Published message {} to in-process channel '{}'",
            message_id,
            self.channel
        );
        Ok(message_id)
    }

    async fn consume_one(&self, timeout: Duration) -> Result<(Uuid, Row)> {
        let mut receiver = self.receiver.lock().await;

        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(payload)) => envelope::decode(&payload),
            Ok(None) => Err(EtlError::ConnectionError(format!(
                "in-process channel '{}' is closed",
                self.channel
            ))),
            Err(_) => Err(EtlError::ConsumeTimeoutError {
                channel: self.channel.clone(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
