use axum::{extract::Path, Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use project_store::{ProjectRecord, ProjectStore, ProjectSummary};

use super::{assets::keys_safe_to_delete, OkResponse};
use crate::{
    asset_keys::invalid_id_error,
    blob_store::SharedBlobStore,
    types::AppError,
};

const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Display title for the new project
    pub title: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub ok: bool,
    pub project: ProjectRecord,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub ok: bool,
    pub projects: Vec<ProjectSummary>,
}

/// Creates an empty project with a server-generated id
#[instrument(skip(project_store, payload))]
pub async fn create_project(
    Extension(project_store): Extension<ProjectStore>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Project title must not be empty"));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(AppError::validation(format!(
            "Project title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }

    let project = project_store.create(title).await?;
    tracing::info!("Created project {}", project.id);

    Ok(Json(ProjectResponse { ok: true, project }))
}

/// Lists all projects, newest first
#[instrument(skip(project_store))]
pub async fn list_projects(
    Extension(project_store): Extension<ProjectStore>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let projects = project_store.list().await?;
    Ok(Json(ProjectListResponse { ok: true, projects }))
}

/// Fetches one project with its asset list
#[instrument(skip(project_store))]
pub async fn get_project(
    Path(project_id): Path<String>,
    Extension(project_store): Extension<ProjectStore>,
) -> Result<Json<ProjectResponse>, AppError> {
    if let Some(message) = invalid_id_error(&project_id, "projectId") {
        return Err(AppError::validation(message));
    }

    let project = project_store
        .get(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("project_not_found", "Project not found"))?;

    Ok(Json(ProjectResponse { ok: true, project }))
}

/// Deletes a project and every blob object its assets own
///
/// Fail-closed: if any stored key pair cannot be attributed to its asset,
/// nothing is deleted. Blob objects go first so a crash mid-operation
/// leaves orphaned-but-harmless blobs rather than metadata pointing at
/// nothing.
#[instrument(skip(project_store, blob_store))]
pub async fn delete_project(
    Path(project_id): Path<String>,
    Extension(project_store): Extension<ProjectStore>,
    Extension(blob_store): Extension<SharedBlobStore>,
) -> Result<Json<OkResponse>, AppError> {
    if let Some(message) = invalid_id_error(&project_id, "projectId") {
        return Err(AppError::validation(message));
    }

    let project = project_store
        .get(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("project_not_found", "Project not found"))?;

    // Validate every pair before deleting anything
    for asset in &project.data.assets {
        if !keys_safe_to_delete(&project_id, asset) {
            return Err(AppError::validation(format!(
                "Stored keys for asset {} are inconsistent; aborting delete",
                asset.asset_id
            )));
        }
    }

    let keys: Vec<String> = project
        .data
        .assets
        .iter()
        .flat_map(|asset| [asset.original_key.clone(), asset.thumb_key.clone()])
        .collect();

    if !keys.is_empty() {
        blob_store.delete_many(&keys).await?;
    }

    project_store.delete(&project_id).await?;
    tracing::info!(
        "Deleted project {project_id} and {} blob objects",
        keys.len()
    );

    Ok(Json(OkResponse { ok: true }))
}
