// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aide::openapi::OpenApi;
use axum::{body::Body, http::Request, response::Response, Extension, Router};
use tower::ServiceExt;

use backend::{
    blob_store::{MemoryBlobStore, SharedBlobStore},
    quota::QuotaGuard,
    routes,
    types::Environment,
};
use project_store::ProjectStore;
use sqlx::sqlite::SqlitePoolOptions;

/// Test harness: the full router over an in-memory blob store and an
/// in-memory SQLite database
pub struct TestContext {
    pub router: Router,
    pub blob_store: Arc<MemoryBlobStore>,
    pub project_store: ProjectStore,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_quota_limit(backend::quota::DEFAULT_QUOTA_LIMIT_BYTES).await
    }

    pub async fn with_quota_limit(quota_limit_bytes: u64) -> Self {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();

        let blob_store = Arc::new(MemoryBlobStore::new());
        let shared_blob_store: SharedBlobStore = blob_store.clone();

        // One connection: every pooled connection would otherwise open its
        // own private in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        let project_store = ProjectStore::new(pool);
        project_store.migrate().await.unwrap();

        // Zero TTL so every request sees live usage
        let quota = Arc::new(QuotaGuard::new(
            shared_blob_store.clone(),
            quota_limit_bytes,
            Duration::ZERO,
        ));

        let router: Router = routes::handler()
            .layer(Extension(OpenApi::default()))
            .layer(Extension(Environment::Development))
            .layer(Extension(shared_blob_store))
            .layer(Extension(project_store.clone()))
            .layer(Extension(quota))
            .into();

        Self {
            router,
            blob_store,
            project_store,
        }
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_put_bytes(
        &self,
        route: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method("PUT");
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(bytes))?)
            .await?;
        Ok(response)
    }

    pub async fn send_put_stream(
        &self,
        route: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method("PUT");
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_delete_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("DELETE")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn parse_response_body(
        &self,
        response: Response,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        let json = serde_json::from_slice(&body)?;
        Ok(json)
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, title: &str) -> String {
        let response = self
            .send_post_request("/api/projects", serde_json::json!({ "title": title }))
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), http::StatusCode::OK);

        let body = self.parse_response_body(response).await.unwrap();
        body["project"]["id"].as_str().unwrap().to_string()
    }
}

/// A fresh asset id for tests
pub fn random_asset_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
