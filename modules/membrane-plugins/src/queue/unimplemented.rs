use async_trait::async_trait;

use super::{FailedTask, NitricTask, QueueService};
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "queue";

/// Default queue backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedQueueService;

#[async_trait]
impl QueueService for UnimplementedQueueService {
    async fn send(&self, _queue: &str, _task: NitricTask) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "send"))
    }

    async fn send_batch(&self, _queue: &str, _tasks: Vec<NitricTask>) -> Result<Vec<FailedTask>> {
        Err(PluginError::not_implemented(CAPABILITY, "send_batch"))
    }

    async fn receive(&self, _queue: &str, _depth: u32) -> Result<Vec<NitricTask>> {
        Err(PluginError::not_implemented(CAPABILITY, "receive"))
    }

    async fn complete(&self, _queue: &str, _lease_id: &str) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "complete"))
    }
}
