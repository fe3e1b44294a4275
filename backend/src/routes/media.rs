use axum::{
    extract::Path,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use tracing::instrument;

use crate::{
    asset_keys::{build_asset_keys, invalid_id_error},
    blob_store::SharedBlobStore,
    types::AppError,
    upload::{UploadKind, DEFAULT_THUMB_CONTENT_TYPE},
};

/// Serves the stored bytes of one asset object
#[instrument(skip(blob_store))]
pub async fn serve_asset(
    Path((project_id, asset_id, kind)): Path<(String, String, String)>,
    Extension(blob_store): Extension<SharedBlobStore>,
) -> Result<Response, AppError> {
    for (value, label) in [(&project_id, "projectId"), (&asset_id, "assetId")] {
        if let Some(message) = invalid_id_error(value, label) {
            return Err(AppError::validation(message));
        }
    }

    let Ok(kind) = kind.parse::<UploadKind>() else {
        return Err(AppError::validation(format!("Invalid media kind: {kind}")));
    };

    let keys = build_asset_keys(&project_id, &asset_id);
    let key = kind.key(&keys);

    let object = blob_store
        .get(key)
        .await?
        .ok_or_else(|| AppError::not_found("asset_not_found", "Asset not found"))?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| DEFAULT_THUMB_CONTENT_TYPE.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        object.bytes,
    )
        .into_response())
}
