use async_trait::async_trait;

use super::StorageService;
use crate::error::{PluginError, Result};

const CAPABILITY: &str = "storage";

/// Default storage backend. Every operation fails with `NotImplemented`.
pub struct UnimplementedStorageService;

#[async_trait]
impl StorageService for UnimplementedStorageService {
    async fn put(&self, _bucket: &str, _key: &str, _data: Vec<u8>) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "put"))
    }

    async fn get(&self, _bucket: &str, _key: &str) -> Result<Vec<u8>> {
        Err(PluginError::not_implemented(CAPABILITY, "get"))
    }

    async fn delete(&self, _bucket: &str, _key: &str) -> Result<()> {
        Err(PluginError::not_implemented(CAPABILITY, "delete"))
    }
}
