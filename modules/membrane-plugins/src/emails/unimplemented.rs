use async_trait::async_trait;

use super::{EmailMessage, EmailService};
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "emails";

/// Default email backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedEmailService;

#[async_trait]
impl EmailService for UnimplementedEmailService {
    async fn send(&self, _message: &EmailMessage) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "send"))
    }
}
