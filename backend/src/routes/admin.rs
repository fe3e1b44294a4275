use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use project_store::ProjectStore;

use crate::{blob_store::SharedBlobStore, quota::QuotaGuard, types::AppError};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    /// Storage key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// ISO-8601 upload timestamp, when the store reports one
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageListResponse {
    pub ok: bool,
    pub objects: Vec<StorageObject>,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub ok: bool,
    pub deleted_objects: usize,
    pub deleted_projects: u64,
}

/// Collects every key in the store, following cursors until exhausted
async fn collect_all_objects(blob_store: &SharedBlobStore) -> Result<Vec<StorageObject>, AppError> {
    let mut objects = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = blob_store.list_page(cursor.as_deref()).await?;
        objects.extend(page.objects.into_iter().map(|meta| StorageObject {
            key: meta.key,
            size: meta.size,
            uploaded_at: meta.uploaded_at.map(|ts| ts.to_rfc3339()),
        }));

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(objects)
}

/// Lists every object in the blob store
#[instrument(skip(blob_store))]
pub async fn list_storage(
    Extension(blob_store): Extension<SharedBlobStore>,
) -> Result<Json<StorageListResponse>, AppError> {
    let objects = collect_all_objects(&blob_store).await?;
    let total_bytes = objects.iter().map(|o| o.size).sum();

    Ok(Json(StorageListResponse {
        ok: true,
        objects,
        total_bytes,
    }))
}

/// Destroys everything: every blob object, then every project row
///
/// No per-asset validation; the whole store is going away. Irreversible.
#[instrument(skip(blob_store, project_store, quota))]
pub async fn full_reset(
    Extension(blob_store): Extension<SharedBlobStore>,
    Extension(project_store): Extension<ProjectStore>,
    Extension(quota): Extension<Arc<QuotaGuard>>,
) -> Result<Json<ResetResponse>, AppError> {
    let objects = collect_all_objects(&blob_store).await?;
    let keys: Vec<String> = objects.into_iter().map(|o| o.key).collect();

    if !keys.is_empty() {
        blob_store.delete_many(&keys).await?;
    }

    let deleted_projects = project_store.truncate().await?;
    quota.invalidate().await;

    tracing::warn!(
        "Full reset: removed {} blob objects and {deleted_projects} projects",
        keys.len()
    );

    Ok(Json(ResetResponse {
        ok: true,
        deleted_objects: keys.len(),
        deleted_projects,
    }))
}
