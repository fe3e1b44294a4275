use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing_subscriber::{fmt, EnvFilter};

use backend::{
    blob_store::{S3BlobStore, SharedBlobStore},
    quota::{QuotaGuard, USAGE_CACHE_TTL},
    server,
    types::Environment,
};
use project_store::ProjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON log format in production, plain format for development
    match environment {
        Environment::Production => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let blob_store: SharedBlobStore =
        Arc::new(S3BlobStore::new(s3_client, environment.s3_bucket()));

    let options = SqliteConnectOptions::new()
        .filename(environment.database_path())
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    let project_store = ProjectStore::new(pool);
    project_store.migrate().await?;

    let quota = Arc::new(QuotaGuard::new(
        blob_store.clone(),
        environment.quota_limit_bytes(),
        USAGE_CACHE_TTL,
    ));

    server::start(environment, blob_store, project_store, quota).await
}
