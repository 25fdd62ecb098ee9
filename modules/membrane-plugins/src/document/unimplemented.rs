use async_trait::async_trait;
use membrane_common::Payload;

use super::DocumentService;
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "document";

/// Default document backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedDocumentService;

#[async_trait]
impl DocumentService for UnimplementedDocumentService {
    async fn get(&self, _collection: &str, _key: &str) -> Result<Payload> {
        Err(PluginError::not_implemented(CAPABILITY, "get"))
    }

    async fn set(&self, _collection: &str, _key: &str, _value: Payload) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "set"))
    }

    async fn delete(&self, _collection: &str, _key: &str) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "delete"))
    }
}
