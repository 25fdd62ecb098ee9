pub mod unimplemented;

pub use unimplemented::UnimplementedStorageService;

use async_trait::async_trait;

use crate::error::Result;

/// Blob storage addressed by bucket and object key.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}
