use std::sync::Arc;

use axum::{
    extract::{Path, Request},
    http::{header, StatusCode},
    Extension, Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use project_store::{ProjectStore, ProjectStoreError, MAX_ASSETS_PER_PROJECT};

use crate::{
    asset_keys::{build_asset_keys, invalid_id_error},
    blob_store::SharedBlobStore,
    quota::QuotaGuard,
    types::AppError,
    upload::{
        capped_body_stream, is_allowed_original_type, UploadKind, DEFAULT_THUMB_CONTENT_TYPE,
        MAX_FILE_SIZE_BYTES,
    },
};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    /// Storage key the bytes were written under
    pub key: String,
    /// Number of bytes written
    pub byte_size: u64,
}

/// Stores raw bytes under the derived key for one asset object
///
/// Steps, in order: identifier validation, quota gate, declared size and
/// content-type checks, per-project cap for new originals, then the capped
/// streaming write. Nothing touches the blob store until every pre-flight
/// check has passed.
#[instrument(skip(quota, blob_store, project_store, request))]
pub async fn upload_asset(
    Path((project_id, asset_id, kind)): Path<(String, String, String)>,
    Extension(quota): Extension<Arc<QuotaGuard>>,
    Extension(blob_store): Extension<SharedBlobStore>,
    Extension(project_store): Extension<ProjectStore>,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    for (value, label) in [(&project_id, "projectId"), (&asset_id, "assetId")] {
        if let Some(message) = invalid_id_error(value, label) {
            return Err(AppError::validation(message));
        }
    }

    let Ok(kind) = kind.parse::<UploadKind>() else {
        return Err(AppError::validation(format!("Invalid upload kind: {kind}")));
    };

    let status = quota.quota_status().await?;
    if !status.uploads_allowed {
        return Err(AppError::new(
            StatusCode::FORBIDDEN,
            "quota_exceeded",
            status
                .reason
                .unwrap_or_else(|| "Storage quota exceeded".to_string()),
            false,
        ));
    }

    // The declared length is only a fast-fail hint; the true ceiling is
    // enforced against the streamed bytes below.
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if declared_length.is_some_and(|length| length > MAX_FILE_SIZE_BYTES) {
        return Err(AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            format!("Upload exceeds the {MAX_FILE_SIZE_BYTES} byte limit"),
            false,
        ));
    }

    let declared_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let content_type = match kind {
        UploadKind::Original => {
            let Some(content_type) = declared_type else {
                return Err(AppError::validation(
                    "Content-Type header is required for original uploads",
                ));
            };
            if !is_allowed_original_type(&content_type) {
                return Err(AppError::new(
                    StatusCode::BAD_REQUEST,
                    "unsupported_media_type",
                    format!("Content type {content_type} is not allowed"),
                    false,
                ));
            }
            content_type
        }
        UploadKind::Thumb => declared_type.unwrap_or_else(|| DEFAULT_THUMB_CONTENT_TYPE.to_string()),
    };

    let project = project_store
        .get(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("project_not_found", "Project not found"))?;

    // A new original claims a slot; re-uploads and thumbnails do not
    if kind == UploadKind::Original
        && !project.data.has_asset(&asset_id)
        && project.data.assets.len() >= MAX_ASSETS_PER_PROJECT
    {
        return Err(ProjectStoreError::AssetLimitReached(MAX_ASSETS_PER_PROJECT).into());
    }

    let keys = build_asset_keys(&project_id, &asset_id);
    let key = kind.key(&keys).to_string();
    let body = capped_body_stream(request.into_body(), MAX_FILE_SIZE_BYTES);

    let byte_size = blob_store.put(&key, body, &content_type).await?;

    tracing::info!("Stored {byte_size} bytes at {key}");
    Ok(Json(UploadResponse {
        ok: true,
        key,
        byte_size,
    }))
}
