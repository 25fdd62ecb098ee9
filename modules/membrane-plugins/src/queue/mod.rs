pub mod unimplemented;

pub use unimplemented::UnimplementedQueueService;

use async_trait::async_trait;
use membrane_common::Payload;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A unit of queued work.
///
/// `lease_id` is only set on tasks handed out by [`QueueService::receive`]
/// and is what [`QueueService::complete`] acknowledges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NitricTask {
    pub id: String,
    #[serde(default)]
    pub payload_type: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
}

/// A task the backend refused during a batch send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: NitricTask,
    pub message: String,
}

#[async_trait]
pub trait QueueService: Send + Sync {
    /// Push a single task.
    async fn send(&self, queue: &str, task: NitricTask) -> Result<()>;

    /// Push a batch. Tasks the backend could not accept are returned rather
    /// than failing the whole batch.
    async fn send_batch(&self, queue: &str, tasks: Vec<NitricTask>) -> Result<Vec<FailedTask>>;

    /// Lease up to `depth` tasks.
    async fn receive(&self, queue: &str, depth: u32) -> Result<Vec<NitricTask>>;

    /// Acknowledge a leased task so it is not redelivered.
    async fn complete(&self, queue: &str, lease_id: &str) -> Result<()>;
}
