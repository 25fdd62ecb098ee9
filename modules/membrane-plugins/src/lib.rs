//! Capability contracts for the membrane and the backends that satisfy them.
//!
//! Each capability (document, events, gateway, queue, storage, emails) is a
//! trait consumed as `Arc<dyn Trait>`. Every capability ships an
//! `Unimplemented*` backend that fails each operation with
//! [`PluginError::NotImplemented`], so a membrane can always be composed even
//! when a capability has no real backend wired.

pub mod document;
pub mod emails;
pub mod error;
pub mod events;
pub mod gateway;
pub mod queue;
pub mod storage;

pub use document::{DocumentService, UnimplementedDocumentService};
pub use emails::{EmailMessage, EmailService, UnimplementedEmailService};
pub use error::{PluginError, Result};
pub use events::{
    DevEventsService, EventService, OutboundRequest, ReqwestSubscriberClient, SubscriberClient,
    UnimplementedEventService,
};
pub use gateway::{
    GatewayService, HttpGateway, HttpTrigger, Trigger, TriggerHandler, TriggerResponse,
    UnimplementedGatewayService,
};
pub use queue::{FailedTask, NitricTask, QueueService, UnimplementedQueueService};
pub use storage::{StorageService, UnimplementedStorageService};
