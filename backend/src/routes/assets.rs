use axum::{extract::Path, Extension, Json};
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use project_store::{AssetMetadata, ProjectStore};

use super::OkResponse;
use crate::{
    asset_keys::{build_asset_keys, invalid_id_error, is_legacy_key_safe, keys_match},
    blob_store::SharedBlobStore,
    types::AppError,
};

/// Whether a stored key pair is safely attributable to this asset
///
/// Strict derivation match, with the permissive substring check as the
/// fallback for assets written under the older naming convention. A pair
/// failing both points at someone else's objects and must not be deleted.
pub(crate) fn keys_safe_to_delete(project_id: &str, asset: &AssetMetadata) -> bool {
    keys_match(
        project_id,
        &asset.asset_id,
        &asset.original_key,
        &asset.thumb_key,
    ) || (is_legacy_key_safe(project_id, &asset.asset_id, &asset.original_key)
        && is_legacy_key_safe(project_id, &asset.asset_id, &asset.thumb_key))
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitAssetRequest {
    /// Asset identifier (36-char hyphenated hex token)
    pub asset_id: String,
    /// Expected original key; must equal the derived key when present
    #[serde(default)]
    pub original_key: Option<String>,
    /// Expected thumbnail key; must equal the derived key when present
    #[serde(default)]
    pub thumb_key: Option<String>,
    /// Content type of the original upload
    pub content_type: String,
    /// Size of the original upload in bytes
    pub byte_size: u64,
    /// Pixel width, when known
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height, when known
    #[serde(default)]
    pub height: Option<u32>,
    /// Original file name
    pub file_name: String,
    /// ISO-8601 commit timestamp; defaults to now
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitAssetResponse {
    pub ok: bool,
    pub asset: AssetMetadata,
}

/// Commits an asset's metadata into its project document
///
/// The stored record always carries the derived key pair; a payload naming
/// different keys is rejected before the document is touched.
#[instrument(skip(project_store, payload))]
pub async fn commit_asset(
    Path(project_id): Path<String>,
    Extension(project_store): Extension<ProjectStore>,
    Json(payload): Json<CommitAssetRequest>,
) -> Result<Json<CommitAssetResponse>, AppError> {
    for (value, label) in [(&project_id, "projectId"), (&payload.asset_id, "assetId")] {
        if let Some(message) = invalid_id_error(value, label) {
            return Err(AppError::validation(message));
        }
    }

    let keys = build_asset_keys(&project_id, &payload.asset_id);
    if payload
        .original_key
        .as_ref()
        .is_some_and(|key| *key != keys.original_key)
    {
        return Err(AppError::validation(
            "originalKey does not match the derived key",
        ));
    }
    if payload
        .thumb_key
        .as_ref()
        .is_some_and(|key| *key != keys.thumb_key)
    {
        return Err(AppError::validation(
            "thumbKey does not match the derived key",
        ));
    }

    let mut project = project_store
        .get(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("project_not_found", "Project not found"))?;

    let asset = AssetMetadata {
        asset_id: payload.asset_id,
        original_key: keys.original_key,
        thumb_key: keys.thumb_key,
        content_type: payload.content_type,
        byte_size: payload.byte_size,
        width: payload.width,
        height: payload.height,
        file_name: payload.file_name,
        created_at: payload
            .created_at
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
    };

    project.data.upsert_asset(asset.clone())?;

    if !project_store.update_data(&project_id, &project.data).await? {
        return Err(AppError::not_found("project_not_found", "Project not found"));
    }

    tracing::info!("Committed asset {} to project {project_id}", asset.asset_id);
    Ok(Json(CommitAssetResponse { ok: true, asset }))
}

/// Deletes one asset: both blob objects first, then the metadata entry
#[instrument(skip(project_store, blob_store))]
pub async fn delete_asset(
    Path((project_id, asset_id)): Path<(String, String)>,
    Extension(project_store): Extension<ProjectStore>,
    Extension(blob_store): Extension<SharedBlobStore>,
) -> Result<Json<OkResponse>, AppError> {
    for (value, label) in [(&project_id, "projectId"), (&asset_id, "assetId")] {
        if let Some(message) = invalid_id_error(value, label) {
            return Err(AppError::validation(message));
        }
    }

    let mut project = project_store
        .get(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("project_not_found", "Project not found"))?;

    let Some(asset) = project.data.find_asset(&asset_id).cloned() else {
        return Err(AppError::not_found("asset_not_found", "Asset not found"));
    };

    if !keys_safe_to_delete(&project_id, &asset) {
        return Err(AppError::validation(
            "Stored keys for this asset are inconsistent; refusing to delete",
        ));
    }

    // Absent objects are fine; the deletes are idempotent
    blob_store.delete(&asset.original_key).await?;
    blob_store.delete(&asset.thumb_key).await?;

    project.data.remove_asset(&asset_id);
    if !project_store.update_data(&project_id, &project.data).await? {
        return Err(AppError::not_found("project_not_found", "Project not found"));
    }

    tracing::info!("Deleted asset {asset_id} from project {project_id}");
    Ok(Json(OkResponse { ok: true }))
}
