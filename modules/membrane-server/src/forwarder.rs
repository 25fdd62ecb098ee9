use std::time::Duration;

use async_trait::async_trait;
use membrane_common::{headers, SOURCE_TYPE_REQUEST, SOURCE_TYPE_SUBSCRIPTION};
use membrane_plugins::{HttpTrigger, PluginError, Trigger, TriggerHandler, TriggerResponse};
use reqwest::Method;
use tracing::debug;

use crate::error::{MembraneError, Result};

const FORWARD_TIMEOUT: Duration = Duration::from_secs(60);

/// Request headers owned by the forwarding hop rather than the caller.
const SKIPPED_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "keep-alive",
    headers::SOURCE_TYPE,
    headers::SOURCE,
];

/// Hands gateway triggers to the child application over HTTP.
pub struct ChildForwarder {
    http: reqwest::Client,
    base_url: String,
}

impl ChildForwarder {
    pub fn new(child_address: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()
            .map_err(|e| MembraneError::Construction(format!("failed to build HTTP client: {e}")))?;

        let base_url = if child_address.starts_with("http://") || child_address.starts_with("https://") {
            child_address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", child_address.trim_end_matches('/'))
        };

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http_request(&self, request: HttpTrigger) -> membrane_plugins::Result<reqwest::RequestBuilder> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| PluginError::InvalidArgument(format!("invalid method '{}'", request.method)))?;

        let mut url = format!("{}{}", self.base_url, request.path);
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }

        let mut builder = self
            .http
            .request(method, url)
            .header(headers::SOURCE_TYPE, SOURCE_TYPE_REQUEST)
            .header(headers::SOURCE, request.path.as_str());
        for (name, value) in &request.headers {
            if SKIPPED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(builder.body(request.body))
    }
}

#[async_trait]
impl TriggerHandler for ChildForwarder {
    async fn handle(&self, trigger: Trigger) -> membrane_plugins::Result<TriggerResponse> {
        let builder = match trigger {
            Trigger::Http(request) => {
                debug!(method = %request.method, path = %request.path, "Forwarding request to child");
                self.http_request(request)?
            }
            Trigger::Event { topic, event } => {
                debug!(topic = %topic, event_id = %event.id, "Forwarding event to child");
                self.http
                    .post(format!("{}/", self.base_url))
                    .header(headers::REQUEST_ID, event.id.as_str())
                    .header(headers::PAYLOAD_TYPE, event.payload_type.as_str())
                    .header(headers::SOURCE_TYPE, SOURCE_TYPE_SUBSCRIPTION)
                    .header(headers::SOURCE, topic.as_str())
                    .json(&event.payload)
            }
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let response_headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(TriggerResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
