//! Storage quota gating
//!
//! Aggregate bucket usage is expensive to compute (a full paginated
//! enumeration), so the guard keeps a time-bounded cache. Every
//! upload-initiating operation must consult [`QuotaGuard::quota_status`]
//! before accepting bytes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::blob_store::{BlobStore, BlobStoreResult};

/// Default aggregate storage ceiling: 10 GiB
pub const DEFAULT_QUOTA_LIMIT_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Remaining space below which the quota is reported as near its limit: 200 MiB
pub const QUOTA_SAFETY_BUFFER_BYTES: u64 = 200 * 1024 * 1024;

/// How long a computed usage total stays fresh
pub const USAGE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct UsageSnapshot {
    used_bytes: u64,
    refreshed_at: Instant,
    updated_at: DateTime<Utc>,
}

/// Aggregate usage and the configured ceiling
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    /// Bytes currently occupied across all blob objects
    pub used_bytes: u64,
    /// Configured ceiling in bytes
    pub limit_bytes: u64,
    /// Bytes still available, floored at zero
    pub remaining_bytes: u64,
    /// Whether remaining space is below the safety buffer
    pub near_limit: bool,
    /// ISO-8601 UTC timestamp of the last usage computation
    pub updated_at: String,
}

/// Whether uploads are currently permitted
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    /// False once the ceiling is reached
    pub uploads_allowed: bool,
    /// Human-readable reason when uploads are disallowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// ISO-8601 UTC timestamp of the last usage computation
    pub updated_at: String,
}

/// Quota guard over a blob store
///
/// The cache lives inside the guard and the guard is shared via `Arc`, so
/// tests control freshness through the TTL instead of global state.
pub struct QuotaGuard {
    blob_store: Arc<dyn BlobStore>,
    limit_bytes: u64,
    cache_ttl: Duration,
    cache: Mutex<Option<UsageSnapshot>>,
}

impl QuotaGuard {
    /// Creates a guard with the given ceiling and cache TTL
    #[must_use]
    pub fn new(blob_store: Arc<dyn BlobStore>, limit_bytes: u64, cache_ttl: Duration) -> Self {
        Self {
            blob_store,
            limit_bytes,
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// The configured ceiling in bytes
    #[must_use]
    pub const fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Drops the cached total so the next read re-enumerates
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Aggregate byte usage, served from cache when fresh
    ///
    /// A stale or empty cache triggers a full paginated enumeration of the
    /// store, following continuation cursors until exhausted. Concurrent
    /// callers wait on the in-flight refresh rather than racing their own.
    ///
    /// # Errors
    ///
    /// Surfaces enumeration failures as hard errors; a backend outage must
    /// never read as zero usage and falsely allow unlimited uploads.
    pub async fn storage_usage(&self) -> BlobStoreResult<u64> {
        Ok(self.snapshot().await?.used_bytes)
    }

    /// Usage, ceiling and the near-limit flag
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures from the blob store.
    pub async fn quota_info(&self) -> BlobStoreResult<QuotaInfo> {
        let snapshot = self.snapshot().await?;
        let remaining_bytes = self.limit_bytes.saturating_sub(snapshot.used_bytes);

        Ok(QuotaInfo {
            used_bytes: snapshot.used_bytes,
            limit_bytes: self.limit_bytes,
            remaining_bytes,
            near_limit: remaining_bytes < QUOTA_SAFETY_BUFFER_BYTES,
            updated_at: snapshot.updated_at.to_rfc3339(),
        })
    }

    /// The upload gate
    ///
    /// # Errors
    ///
    /// Propagates enumeration failures from the blob store.
    pub async fn quota_status(&self) -> BlobStoreResult<QuotaStatus> {
        let info = self.quota_info().await?;
        let uploads_allowed = info.remaining_bytes > 0;

        Ok(QuotaStatus {
            uploads_allowed,
            reason: (!uploads_allowed).then(|| {
                format!(
                    "Storage quota exceeded: {} of {} bytes used",
                    info.used_bytes, info.limit_bytes
                )
            }),
            updated_at: info.updated_at,
        })
    }

    async fn snapshot(&self) -> BlobStoreResult<UsageSnapshot> {
        let mut cache = self.cache.lock().await;
        if let Some(snapshot) = *cache {
            if snapshot.refreshed_at.elapsed() < self.cache_ttl {
                return Ok(snapshot);
            }
        }

        let used_bytes = self.enumerate_usage().await?;
        let snapshot = UsageSnapshot {
            used_bytes,
            refreshed_at: Instant::now(),
            updated_at: Utc::now(),
        };
        *cache = Some(snapshot);

        tracing::debug!("Refreshed storage usage: {used_bytes} bytes");
        Ok(snapshot)
    }

    async fn enumerate_usage(&self) -> BlobStoreResult<u64> {
        let mut total = 0_u64;
        let mut cursor: Option<String> = None;

        loop {
            let page = self.blob_store.list_page(cursor.as_deref()).await?;
            total += page.objects.iter().map(|o| o.size).sum::<u64>();

            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::MemoryBlobStore;

    fn guard_with(
        store: Arc<MemoryBlobStore>,
        limit_bytes: u64,
        cache_ttl: Duration,
    ) -> QuotaGuard {
        QuotaGuard::new(store, limit_bytes, cache_ttl)
    }

    #[tokio::test]
    async fn usage_sums_across_listing_pages() {
        let store = Arc::new(MemoryBlobStore::with_page_size(2));
        for i in 0..5 {
            store.insert_raw(&format!("key-{i}"), vec![0_u8; 10], "image/png");
        }

        let guard = guard_with(store, 1024, Duration::ZERO);
        assert_eq!(guard.storage_usage().await.unwrap(), 50);
    }

    #[tokio::test]
    async fn fresh_cache_skips_enumeration() {
        let store = Arc::new(MemoryBlobStore::new());
        store.insert_raw("a", vec![0_u8; 10], "image/png");

        let guard = guard_with(store.clone(), 1024, Duration::from_secs(300));
        assert_eq!(guard.storage_usage().await.unwrap(), 10);

        // Growth is invisible until the TTL lapses
        store.insert_raw("b", vec![0_u8; 10], "image/png");
        assert_eq!(guard.storage_usage().await.unwrap(), 10);

        guard.invalidate().await;
        assert_eq!(guard.storage_usage().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn zero_ttl_always_recomputes() {
        let store = Arc::new(MemoryBlobStore::new());
        let guard = guard_with(store.clone(), 1024, Duration::ZERO);

        assert_eq!(guard.storage_usage().await.unwrap(), 0);
        store.insert_raw("a", vec![0_u8; 7], "image/png");
        assert_eq!(guard.storage_usage().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn listing_failure_is_a_hard_error() {
        let store = Arc::new(MemoryBlobStore::new());
        store.set_fail_listing(true);

        let guard = guard_with(store, 1024, Duration::ZERO);
        assert!(guard.storage_usage().await.is_err());
        assert!(guard.quota_status().await.is_err());
    }

    #[tokio::test]
    async fn near_limit_reflects_safety_buffer() {
        let store = Arc::new(MemoryBlobStore::new());
        let limit = QUOTA_SAFETY_BUFFER_BYTES + 100;
        store.insert_raw("a", vec![0_u8; 50], "image/png");

        let guard = guard_with(store, limit, Duration::ZERO);
        let info = guard.quota_info().await.unwrap();
        assert_eq!(info.used_bytes, 50);
        assert_eq!(info.remaining_bytes, limit - 50);
        assert!(info.near_limit);

        let status = guard.quota_status().await.unwrap();
        assert!(status.uploads_allowed);
        assert!(status.reason.is_none());
    }

    #[tokio::test]
    async fn full_store_disallows_uploads() {
        let store = Arc::new(MemoryBlobStore::new());
        store.insert_raw("a", vec![0_u8; 100], "image/png");

        let guard = guard_with(store, 100, Duration::ZERO);
        let info = guard.quota_info().await.unwrap();
        assert_eq!(info.remaining_bytes, 0);

        let status = guard.quota_status().await.unwrap();
        assert!(!status.uploads_allowed);
        assert!(status.reason.unwrap().contains("quota exceeded"));
    }
}
