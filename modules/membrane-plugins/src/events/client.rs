use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PluginError, Result};

/// A single POST to a subscriber endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outbound transport used by the dev dispatcher to reach subscribers.
#[async_trait]
pub trait SubscriberClient: Send + Sync {
    /// Send the request and return the response status code.
    async fn post(&self, request: OutboundRequest) -> Result<u16>;
}

pub struct ReqwestSubscriberClient {
    http: reqwest::Client,
}

impl ReqwestSubscriberClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PluginError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SubscriberClient for ReqwestSubscriberClient {
    async fn post(&self, request: OutboundRequest) -> Result<u16> {
        let OutboundRequest { url, headers, body } = request;

        let mut builder = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await?;
        Ok(resp.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let request = OutboundRequest {
            url: "http://a/".into(),
            headers: vec![("X-Nitric-Source".into(), "orders".into())],
            body: Vec::new(),
        };
        assert_eq!(request.header("x-nitric-source"), Some("orders"));
        assert_eq!(request.header("x-nitric-request-id"), None);
    }
}
