//! Project storage for the Mosaic backend
//!
//! This crate owns the relational `projects` table and the JSON asset
//! document embedded in each row. The backend reads and writes the whole
//! document per project; partial updates inside the JSON are never issued.

pub mod project;

pub use project::{
    AssetMetadata, ProjectData, ProjectRecord, ProjectStore, ProjectStoreError,
    ProjectStoreResult, ProjectSummary, MAX_ASSETS_PER_PROJECT, PROJECT_DATA_VERSION,
};
