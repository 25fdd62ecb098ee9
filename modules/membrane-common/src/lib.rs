pub mod config;
pub mod error;
pub mod event;
pub mod shutdown;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use event::{headers, DeliveryPolicy, NitricEvent, Payload, SOURCE_TYPE_REQUEST, SOURCE_TYPE_SUBSCRIPTION};
pub use shutdown::Shutdown;
