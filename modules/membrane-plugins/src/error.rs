use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{capability}.{operation} is not implemented by the configured backend")]
    NotImplemented {
        capability: &'static str,
        operation: &'static str,
    },

    #[error("Publish target not found: topic '{0}' is not declared")]
    PublishTargetNotFound(String),

    #[error("Delivery failed for {failed} of {total} subscribers of topic '{topic}'")]
    DeliveryFailed {
        topic: String,
        failed: usize,
        total: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl PluginError {
    pub fn not_implemented(capability: &'static str, operation: &'static str) -> Self {
        PluginError::NotImplemented {
            capability,
            operation,
        }
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, PluginError::NotImplemented { .. })
    }
}

impl From<reqwest::Error> for PluginError {
    fn from(err: reqwest::Error) -> Self {
        PluginError::Network(err.to_string())
    }
}
