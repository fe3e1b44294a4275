//! Blob store operations for asset storage
//!
//! The store holds raw asset bytes addressed by the keys the
//! [`crate::asset_keys`] builder derives. Durability, replication and
//! encryption are the store's concern, not ours.

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

pub use error::{BlobStoreError, BlobStoreResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// A streamed request body: chunks or a terminal error
pub type BodyStream = BoxStream<'static, BlobStoreResult<Bytes>>;

/// The store as shared by handlers
pub type SharedBlobStore = std::sync::Arc<dyn BlobStore>;

/// One stored object, fully materialized
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object bytes
    pub bytes: Bytes,
    /// Content type recorded at write time
    pub content_type: Option<String>,
}

/// Listing entry for one object
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Storage key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Upload timestamp, when the store reports one
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Objects on this page
    pub objects: Vec<ObjectMeta>,
    /// Continuation cursor; `None` when the listing is exhausted
    pub cursor: Option<String>,
}

/// Key-value object storage holding raw asset bytes
///
/// A `put` for an existing key overwrites; `delete` of an absent key is not
/// an error. Listing is cursor-paginated and callers must loop until no
/// cursor remains.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Streams a body into the store under `key`
    ///
    /// Returns the number of bytes written. A stream error aborts the write
    /// and must not leave a completed object under the key.
    async fn put(&self, key: &str, body: BodyStream, content_type: &str) -> BlobStoreResult<u64>;

    /// Fetches an object; `None` when the key is absent
    async fn get(&self, key: &str) -> BlobStoreResult<Option<StoredObject>>;

    /// Deletes one object; absent keys succeed
    async fn delete(&self, key: &str) -> BlobStoreResult<()>;

    /// Deletes a batch of objects; absent keys succeed
    async fn delete_many(&self, keys: &[String]) -> BlobStoreResult<()>;

    /// Fetches one listing page, continuing from `cursor`
    async fn list_page(&self, cursor: Option<&str>) -> BlobStoreResult<ListPage>;
}
