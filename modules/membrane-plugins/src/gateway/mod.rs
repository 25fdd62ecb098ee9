pub mod http;
pub mod unimplemented;

pub use http::HttpGateway;
pub use unimplemented::UnimplementedGatewayService;

use std::sync::Arc;

use async_trait::async_trait;
use membrane_common::{headers, NitricEvent, Payload, SOURCE_TYPE_SUBSCRIPTION};

use crate::error::Result;

/// A plain inbound HTTP request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpTrigger {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpTrigger {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Inbound unit of work routed to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Http(HttpTrigger),
    Event { topic: String, event: NitricEvent },
}

impl Trigger {
    /// Classify an inbound request.
    ///
    /// Requests marked `x-nitric-source-type: SUBSCRIPTION` with a JSON object
    /// body are subscription deliveries and become event triggers; everything
    /// else stays an HTTP trigger.
    pub fn from_http(request: HttpTrigger) -> Self {
        let is_subscription = request
            .header(headers::SOURCE_TYPE)
            .is_some_and(|source_type| source_type == SOURCE_TYPE_SUBSCRIPTION);
        if !is_subscription {
            return Trigger::Http(request);
        }

        let payload = if request.body.is_empty() {
            Payload::new()
        } else {
            match serde_json::from_slice::<Payload>(&request.body) {
                Ok(payload) => payload,
                Err(_) => return Trigger::Http(request),
            }
        };

        let topic = request.header(headers::SOURCE).unwrap_or_default().to_string();
        let event = NitricEvent::new(
            request.header(headers::REQUEST_ID).unwrap_or_default(),
            request.header(headers::PAYLOAD_TYPE).unwrap_or_default(),
            payload,
        );
        Trigger::Event { topic, event }
    }
}

/// What the application answered.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TriggerResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Receives triggers from a gateway. Implemented by the membrane.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    async fn handle(&self, trigger: Trigger) -> Result<TriggerResponse>;
}

/// Inbound trigger surface.
#[async_trait]
pub trait GatewayService: Send + Sync {
    /// Begin accepting triggers and pass each to `handler`. Resolves only once
    /// serving stops, with `Ok` after [`stop`](GatewayService::stop).
    async fn start(&self, handler: Arc<dyn TriggerHandler>) -> Result<()>;

    /// Stop accepting triggers. Safe to call before `start` and more than once.
    async fn stop(&self) -> Result<()>;
}
