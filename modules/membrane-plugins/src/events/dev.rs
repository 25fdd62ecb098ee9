//! Local development event dispatcher.
//!
//! Holds a fixed topic → subscriber registry and fans each published event
//! out to every subscriber of its topic over HTTP. Delivery follows the
//! configured [`DeliveryPolicy`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use membrane_common::{headers, Config, DeliveryPolicy, NitricEvent, SOURCE_TYPE_SUBSCRIPTION};
use tracing::{debug, info, warn};

use super::client::{OutboundRequest, ReqwestSubscriberClient, SubscriberClient};
use super::EventService;
use crate::error::{PluginError, Result};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DevEventsService {
    subscriptions: HashMap<String, Vec<String>>,
    client: Arc<dyn SubscriberClient>,
    policy: DeliveryPolicy,
}

impl DevEventsService {
    /// Build a dispatcher that delivers over a fresh reqwest client.
    pub fn new(subscriptions: HashMap<String, Vec<String>>) -> Result<Self> {
        let client = ReqwestSubscriberClient::new(DELIVERY_TIMEOUT)?;
        Ok(Self::with_client(Arc::new(client), subscriptions))
    }

    pub fn with_client(
        client: Arc<dyn SubscriberClient>,
        subscriptions: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            subscriptions,
            client,
            policy: DeliveryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build from `LOCAL_SUBSCRIPTIONS`. Returns `None` when no subscriptions
    /// are configured, leaving the events capability to the default backend.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(subscriptions) = config.local_subscriptions.clone() else {
            return Ok(None);
        };
        Ok(Some(Self::new(subscriptions)?.with_policy(config.delivery_policy)))
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    fn request_for(
        &self,
        topic: &str,
        endpoint: &str,
        event: &NitricEvent,
        body: Vec<u8>,
    ) -> OutboundRequest {
        OutboundRequest {
            url: endpoint.to_string(),
            headers: vec![
                (headers::REQUEST_ID.to_string(), event.id.clone()),
                (headers::PAYLOAD_TYPE.to_string(), event.payload_type.clone()),
                (headers::SOURCE_TYPE.to_string(), SOURCE_TYPE_SUBSCRIPTION.to_string()),
                (headers::SOURCE.to_string(), topic.to_string()),
            ],
            body,
        }
    }

    /// Deliver to one endpoint. Returns whether the subscriber accepted it.
    async fn deliver(&self, topic: &str, request: OutboundRequest) -> bool {
        let endpoint = request.url.clone();
        match self.client.post(request).await {
            Ok(status) if (200..300).contains(&status) => {
                debug!(topic, endpoint = %endpoint, status, "Event delivered");
                true
            }
            Ok(status) => {
                warn!(topic, endpoint = %endpoint, status, "Subscriber returned non-success");
                false
            }
            Err(e) => {
                warn!(topic, endpoint = %endpoint, error = %e, "Failed to reach subscriber");
                false
            }
        }
    }
}

#[async_trait]
impl EventService for DevEventsService {
    async fn list_topics(&self) -> Result<Vec<String>> {
        let mut topics: Vec<String> = self.subscriptions.keys().cloned().collect();
        topics.sort();
        Ok(topics)
    }

    async fn publish(&self, topic: &str, event: &NitricEvent) -> Result<()> {
        let endpoints = self
            .subscriptions
            .get(topic)
            .ok_or_else(|| PluginError::PublishTargetNotFound(topic.to_string()))?;

        if endpoints.is_empty() {
            debug!(topic, event_id = %event.id, "Topic has no subscribers");
            return Ok(());
        }

        let body = serde_json::to_vec(&event.payload)
            .map_err(|e| PluginError::InvalidArgument(format!("unserializable payload: {e}")))?;

        let deliveries = endpoints.iter().map(|endpoint| {
            let request = self.request_for(topic, endpoint, event, body.clone());
            self.deliver(topic, request)
        });
        let outcomes = join_all(deliveries).await;

        let total = outcomes.len();
        let failed = outcomes.iter().filter(|delivered| !**delivered).count();
        info!(
            topic,
            event_id = %event.id,
            subscribers = total,
            failed,
            "Published event"
        );

        match self.policy {
            DeliveryPolicy::RequireAll if failed > 0 => Err(PluginError::DeliveryFailed {
                topic: topic.to_string(),
                failed,
                total,
            }),
            _ => Ok(()),
        }
    }
}
