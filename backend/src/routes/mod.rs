//! Route assembly for the Mosaic API

pub mod admin;
pub mod assets;
mod docs;
pub mod media;
pub mod projects;
pub mod quota;
pub mod uploads;

use aide::axum::{
    routing::{delete, get, post},
    ApiRouter,
};
use axum::middleware;
use schemars::JsonSchema;
use serde::Serialize;

use crate::middleware::auth::admin_auth_middleware;

/// Minimal success envelope for mutating operations
#[derive(Debug, Serialize, JsonSchema)]
pub struct OkResponse {
    /// Always true on success
    pub ok: bool,
}

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    let admin_routes = ApiRouter::new()
        .api_route("/admin/storage", get(admin::list_storage))
        .api_route("/admin/reset", delete(admin::full_reset))
        .layer(middleware::from_fn(admin_auth_middleware));

    let api_routes = ApiRouter::new()
        .api_route(
            "/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .api_route(
            "/projects/{project_id}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .api_route(
            "/projects/{project_id}/assets/commit",
            post(assets::commit_asset),
        )
        .api_route(
            "/projects/{project_id}/assets/{asset_id}",
            delete(assets::delete_asset),
        )
        .api_route("/quota", get(quota::get_quota))
        // Raw-body routes stay off the OpenAPI surface
        .route(
            "/upload/{project_id}/{asset_id}/{kind}",
            axum::routing::put(uploads::upload_asset),
        )
        .route(
            "/media/{project_id}/{asset_id}/{kind}",
            axum::routing::get(media::serve_asset),
        )
        .merge(admin_routes);

    ApiRouter::new().merge(docs::handler()).nest("/api", api_routes)
}
