use std::collections::HashMap;
use std::env;
use std::time::Duration;

use tracing::info;

use crate::error::{ConfigError, Result};
use crate::event::DeliveryPolicy;

/// Membrane configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Serving surfaces
    pub service_address: String,
    pub gateway_address: String,

    // Child application
    pub child_address: String,
    pub child_command: Option<Vec<String>>,
    pub child_timeout: Duration,

    // Local events
    pub local_subscriptions: Option<HashMap<String, Vec<String>>>,
    pub delivery_policy: DeliveryPolicy,

    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let child_command = lookup("INVOKE")
            .map(|cmd| {
                cmd.split_whitespace()
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|parts| !parts.is_empty());

        let local_subscriptions = match lookup("LOCAL_SUBSCRIPTIONS") {
            Some(raw) if !raw.trim().is_empty() => Some(
                serde_json::from_str::<HashMap<String, Vec<String>>>(&raw)
                    .map_err(|e| ConfigError::invalid("LOCAL_SUBSCRIPTIONS", e.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            service_address: var("MEMBRANE_ADDRESS", "0.0.0.0:50051"),
            gateway_address: var("GATEWAY_ADDRESS", "0.0.0.0:9001"),
            child_address: var("CHILD_ADDRESS", "127.0.0.1:8080"),
            child_command,
            child_timeout: seconds("CHILD_TIMEOUT_SECONDS", &var("CHILD_TIMEOUT_SECONDS", "10"))?,
            local_subscriptions,
            delivery_policy: var("EVENTS_DELIVERY_POLICY", "best-effort").parse()?,
            shutdown_grace: seconds(
                "SHUTDOWN_GRACE_SECONDS",
                &var("SHUTDOWN_GRACE_SECONDS", "10"),
            )?,
        })
    }

    /// Log the effective configuration. Subscriber URLs are summarised as counts.
    pub fn log_summary(&self) {
        let topics = self
            .local_subscriptions
            .as_ref()
            .map(|subs| subs.len())
            .unwrap_or(0);

        info!(
            service_address = %self.service_address,
            gateway_address = %self.gateway_address,
            child_address = %self.child_address,
            child_command = ?self.child_command,
            child_timeout_secs = self.child_timeout.as_secs(),
            local_topics = topics,
            delivery_policy = %self.delivery_policy,
            "Membrane configuration loaded"
        );
    }
}

fn seconds(key: &'static str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::invalid(key, format!("expected whole seconds, got '{raw}'")))
}
