use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Structured event payload. Always a JSON object on the wire.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Header names of the trigger wire contract shared by the dispatcher,
/// the gateway and the child forwarder.
pub mod headers {
    pub const REQUEST_ID: &str = "x-nitric-request-id";
    pub const PAYLOAD_TYPE: &str = "x-nitric-payload-type";
    pub const SOURCE_TYPE: &str = "x-nitric-source-type";
    pub const SOURCE: &str = "x-nitric-source";
}

pub const SOURCE_TYPE_SUBSCRIPTION: &str = "SUBSCRIPTION";
pub const SOURCE_TYPE_REQUEST: &str = "REQUEST";

/// An event published to a topic.
///
/// `id` is supplied by the publisher and passed through untouched so that
/// subscribers can use it for idempotency and tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NitricEvent {
    pub id: String,
    pub payload_type: String,
    #[serde(default)]
    pub payload: Payload,
}

impl NitricEvent {
    pub fn new(id: impl Into<String>, payload_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            payload_type: payload_type.into(),
            payload,
        }
    }
}

/// How a publish treats subscribers that could not be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Failures are logged and never reported to the publisher.
    #[default]
    BestEffort,
    /// Every subscriber is attempted; the publish fails if any delivery failed.
    RequireAll,
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPolicy::BestEffort => write!(f, "best-effort"),
            DeliveryPolicy::RequireAll => write!(f, "require-all"),
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "besteffort" => Ok(DeliveryPolicy::BestEffort),
            "require-all" | "requireall" => Ok(DeliveryPolicy::RequireAll),
            other => Err(ConfigError::invalid(
                "EVENTS_DELIVERY_POLICY",
                format!("unknown delivery policy '{other}'"),
            )),
        }
    }
}
