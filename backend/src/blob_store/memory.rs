//! In-memory blob store for tests
//!
//! Mirrors the S3 contract: overwriting puts, idempotent deletes,
//! cursor-paginated listing. Call counters let tests assert that a failing
//! operation never reached the store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;

use super::{BlobStore, BlobStoreError, BlobStoreResult, BodyStream, ListPage, ObjectMeta, StoredObject};

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Bytes,
    content_type: String,
    uploaded_at: chrono::DateTime<Utc>,
}

/// In-memory [`BlobStore`] implementation
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    page_size: usize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_listing: AtomicBool,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: 1000,
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_listing: AtomicBool::new(false),
        }
    }

    /// Creates a store whose listings paginate after `page_size` objects
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::new()
        }
    }

    /// Seeds an object directly, bypassing the streaming path
    pub fn insert_raw(&self, key: &str, bytes: impl Into<Bytes>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
                uploaded_at: Utc::now(),
            },
        );
    }

    /// Whether an object exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Total stored bytes
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .lock()
            .unwrap()
            .values()
            .map(|o| o.bytes.len() as u64)
            .sum()
    }

    /// Number of `put` calls that reached the store
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete`/`delete_many` calls that reached the store
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Makes subsequent listings fail, simulating a backend outage
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, mut body: BodyStream, content_type: &str) -> BlobStoreResult<u64> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        // Drain the stream fully before touching the map: a mid-stream
        // error discards the partial buffer and leaves no object behind.
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
        }

        let bytes = buffer.freeze();
        let byte_size = bytes.len() as u64;
        self.insert_raw(key, bytes, content_type);
        Ok(byte_size)
    }

    async fn get(&self, key: &str) -> BlobStoreResult<Option<StoredObject>> {
        Ok(self.objects.lock().unwrap().get(key).map(|object| StoredObject {
            bytes: object.bytes.clone(),
            content_type: Some(object.content_type.clone()),
        }))
    }

    async fn delete(&self, key: &str) -> BlobStoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> BlobStoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list_page(&self, cursor: Option<&str>) -> BlobStoreResult<ListPage> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(BlobStoreError::Upstream(
                "Simulated listing outage".to_string(),
            ));
        }

        let objects = self.objects.lock().unwrap();
        let page: Vec<ObjectMeta> = objects
            .range(cursor.map_or_else(String::new, ToString::to_string)..)
            .filter(|(key, _)| Some(key.as_str()) != cursor)
            .take(self.page_size)
            .map(|(key, object)| ObjectMeta {
                key: key.clone(),
                size: object.bytes.len() as u64,
                uploaded_at: Some(object.uploaded_at),
            })
            .collect();

        let cursor = if page.len() == self.page_size {
            page.last().map(|meta| meta.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: page,
            cursor,
        })
    }
}
