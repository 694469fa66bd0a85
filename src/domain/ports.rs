use crate::domain::model::{Record, Row, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn subset(&self) -> Option<&str>;
    fn rowkey(&self) -> Option<&str>;
    fn header(&self) -> &[String];
    fn rename_from(&self) -> &[String];
    fn rename_to(&self) -> &[String];
    fn split_from(&self) -> &[String];
    fn split_to(&self) -> &[String];
    fn splitters(&self) -> &[String];
    fn consume_timeout(&self) -> Duration;
}

/// One-record-at-a-time publish/consume handoff through a broker channel.
///
/// Channel name and broker address are fixed at construction; each publish
/// tags the row with a fresh correlation identifier and returns only after
/// the broker has acknowledged durable receipt. `consume_one` reads a
/// single message from the earliest available position within the bounded
/// wait and hands back the row together with its identifier.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn publish(&self, row: &[String]) -> Result<Uuid>;
    async fn consume_one(&self, timeout: Duration) -> Result<(Uuid, Row)>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
