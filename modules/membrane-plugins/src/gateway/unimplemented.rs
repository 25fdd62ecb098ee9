use std::sync::Arc;

use async_trait::async_trait;

use super::{GatewayService, TriggerHandler};
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "gateway";

/// Default gateway backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedGatewayService;

#[async_trait]
impl GatewayService for UnimplementedGatewayService {
    async fn start(&self, _handler: Arc<dyn TriggerHandler>) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "start"))
    }

    async fn stop(&self) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "stop"))
    }
}
