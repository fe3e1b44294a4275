use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use crate::{
    quota::{QuotaGuard, QuotaInfo, QuotaStatus},
    types::AppError,
};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub ok: bool,
    /// Usage against the configured ceiling
    pub quota: QuotaInfo,
    /// Whether uploads are currently permitted
    pub status: QuotaStatus,
}

/// Reports usage and the upload gate for the client UI
#[instrument(skip(quota))]
pub async fn get_quota(
    Extension(quota): Extension<Arc<QuotaGuard>>,
) -> Result<Json<QuotaResponse>, AppError> {
    let info = quota.quota_info().await?;
    let status = quota.quota_status().await?;

    Ok(Json(QuotaResponse {
        ok: true,
        quota: info,
        status,
    }))
}
