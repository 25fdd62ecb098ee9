pub mod client;
pub mod dev;
pub mod unimplemented;

pub use client::{OutboundRequest, ReqwestSubscriberClient, SubscriberClient};
pub use dev::DevEventsService;
pub use unimplemented::UnimplementedEventService;

use async_trait::async_trait;
use membrane_common::NitricEvent;

use crate::error::Result;

/// Topic based publish/subscribe.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Names of all declared topics. No ordering is guaranteed.
    async fn list_topics(&self) -> Result<Vec<String>>;

    /// Publish an event to every subscriber of `topic`.
    async fn publish(&self, topic: &str, event: &NitricEvent) -> Result<()>;
}
