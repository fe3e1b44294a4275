//! Project table access and the embedded asset document
//!
//! Each project row embeds one JSON document holding the ordered asset list
//! and an opaque layout blob. The document is read, mutated in memory and
//! written back wholesale; concurrent commits to the same project are
//! last-write-wins.

mod error;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub use error::{ProjectStoreError, ProjectStoreResult};

/// Maximum number of assets a single project may hold
pub const MAX_ASSETS_PER_PROJECT: usize = 50;

/// Current schema version of the embedded project document
pub const PROJECT_DATA_VERSION: u32 = 1;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    id         TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    data       TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// Metadata for one uploaded asset inside a project document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    /// Asset identifier (36-char hyphenated hex token)
    pub asset_id: String,
    /// Blob-store key of the original upload
    pub original_key: String,
    /// Blob-store key of the thumbnail
    pub thumb_key: String,
    /// Declared content type of the original upload
    pub content_type: String,
    /// Size of the original upload in bytes
    pub byte_size: u64,
    /// Pixel width, when known (absent for audio)
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height, when known (absent for audio)
    #[serde(default)]
    pub height: Option<u32>,
    /// Original file name as uploaded by the client
    pub file_name: String,
    /// ISO-8601 UTC timestamp of the commit
    pub created_at: String,
}

/// The JSON document embedded in a project row
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    /// Document schema version
    #[serde(default)]
    pub version: u32,
    /// Ordered asset list (insertion order, no semantic ordering)
    #[serde(default)]
    pub assets: Vec<AssetMetadata>,
    /// Opaque layout state owned by the UI; never interpreted here
    #[serde(default)]
    pub layout: serde_json::Value,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            version: PROJECT_DATA_VERSION,
            assets: Vec::new(),
            layout: serde_json::Value::Null,
        }
    }
}

impl ProjectData {
    /// Parses a stored document, migrating older versions forward
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::Serialization` on malformed JSON and
    /// `ProjectStoreError::UnsupportedVersion` when the document was written
    /// by a newer build.
    pub fn from_json(raw: &str) -> ProjectStoreResult<Self> {
        let mut data: Self = serde_json::from_str(raw)?;
        match data.version {
            // Documents written before explicit versioning carry no version
            // field; they deserialize to 0 and are upgraded in place.
            0 => data.version = PROJECT_DATA_VERSION,
            v if v <= PROJECT_DATA_VERSION => {}
            v => return Err(ProjectStoreError::UnsupportedVersion(v)),
        }
        Ok(data)
    }

    /// Serializes the document for storage
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::Serialization` if encoding fails.
    pub fn to_json(&self) -> ProjectStoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Looks up an asset by id
    #[must_use]
    pub fn find_asset(&self, asset_id: &str) -> Option<&AssetMetadata> {
        self.assets.iter().find(|a| a.asset_id == asset_id)
    }

    /// Whether an asset with this id is present
    #[must_use]
    pub fn has_asset(&self, asset_id: &str) -> bool {
        self.find_asset(asset_id).is_some()
    }

    /// Inserts or replaces an asset entry
    ///
    /// Replaces in place when the asset id is already present; appends
    /// otherwise. The asset cap applies only to appends.
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::AssetLimitReached` when appending past
    /// [`MAX_ASSETS_PER_PROJECT`].
    pub fn upsert_asset(&mut self, asset: AssetMetadata) -> ProjectStoreResult<()> {
        if let Some(existing) = self.assets.iter_mut().find(|a| a.asset_id == asset.asset_id) {
            *existing = asset;
            return Ok(());
        }
        if self.assets.len() >= MAX_ASSETS_PER_PROJECT {
            return Err(ProjectStoreError::AssetLimitReached(MAX_ASSETS_PER_PROJECT));
        }
        self.assets.push(asset);
        Ok(())
    }

    /// Removes an asset entry, returning it when present
    pub fn remove_asset(&mut self, asset_id: &str) -> Option<AssetMetadata> {
        let index = self.assets.iter().position(|a| a.asset_id == asset_id)?;
        Some(self.assets.remove(index))
    }
}

/// One project row with its parsed document
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Project identifier (UUID v4)
    pub id: String,
    /// Display title
    pub title: String,
    /// Parsed asset document
    pub data: ProjectData,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Unix timestamp of last modification
    pub updated_at: i64,
}

/// Listing entry for a project, without the full document
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Number of committed assets
    pub asset_count: usize,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Unix timestamp of last modification
    pub updated_at: i64,
}

/// Project storage client over the SQLite pool
#[derive(Clone)]
pub struct ProjectStore {
    pool: SqlitePool,
}

impl ProjectStore {
    /// Creates a new project store over an existing pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the table schema
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::Database` if the statement fails.
    pub async fn migrate(&self) -> ProjectStoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Creates a new, empty project with a generated UUID v4 id
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError` if the insert or document encoding fails.
    pub async fn create(&self, title: &str) -> ProjectStoreResult<ProjectRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let data = ProjectData::default();
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO projects (id, title, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(data.to_json()?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ProjectRecord {
            id,
            title: title.to_string(),
            data,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetches a project with its parsed document
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError` if the query fails or the stored document
    /// cannot be parsed.
    pub async fn get(&self, id: &str) -> ProjectStoreResult<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, (String, String, String, i64, i64)>(
            "SELECT id, title, data, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, title, data, created_at, updated_at)| {
            Ok(ProjectRecord {
                id,
                title,
                data: ProjectData::from_json(&data)?,
                created_at,
                updated_at,
            })
        })
        .transpose()
    }

    /// Lists all projects, newest first
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError` if the query fails or any stored document
    /// cannot be parsed.
    pub async fn list(&self) -> ProjectStoreResult<Vec<ProjectSummary>> {
        let rows = sqlx::query_as::<_, (String, String, String, i64, i64)>(
            "SELECT id, title, data, created_at, updated_at FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, title, data, created_at, updated_at)| {
                let data = ProjectData::from_json(&data)?;
                Ok(ProjectSummary {
                    id,
                    title,
                    asset_count: data.assets.len(),
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }

    /// Writes the whole document back, bumping the modification timestamp
    ///
    /// Returns `false` when the project row no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError` if encoding or the update fails.
    pub async fn update_data(&self, id: &str, data: &ProjectData) -> ProjectStoreResult<bool> {
        let result = sqlx::query("UPDATE projects SET data = ?, updated_at = ? WHERE id = ?")
            .bind(data.to_json()?)
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a project row. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::Database` if the delete fails.
    pub async fn delete(&self, id: &str) -> ProjectStoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every project row. Used by the administrative full reset.
    ///
    /// # Errors
    ///
    /// Returns `ProjectStoreError::Database` if the delete fails.
    pub async fn truncate(&self) -> ProjectStoreResult<u64> {
        let result = sqlx::query("DELETE FROM projects")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
