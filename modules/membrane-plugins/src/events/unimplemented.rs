use async_trait::async_trait;
use membrane_common::NitricEvent;

use super::EventService;
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "events";

/// Default event backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedEventService;

#[async_trait]
impl EventService for UnimplementedEventService {
    async fn list_topics(&self) -> Result<Vec<String>> {
        Err(PluginError::not_implemented(CAPABILITY, "list_topics"))
    }

    async fn publish(&self, _topic: &str, _event: &NitricEvent) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "publish"))
    }
}
