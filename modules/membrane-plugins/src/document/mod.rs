pub mod unimplemented;

pub use unimplemented::UnimplementedDocumentService;

use async_trait::async_trait;
use membrane_common::Payload;

use crate::error::Result;

/// Key/value document storage, keyed by collection and document key.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Fetch a document. A missing document is [`PluginError::NotFound`](crate::PluginError::NotFound).
    async fn get(&self, collection: &str, key: &str) -> Result<Payload>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, key: &str, value: Payload) -> Result<()>;

    async fn delete(&self, collection: &str, key: &str) -> Result<()>;
}
