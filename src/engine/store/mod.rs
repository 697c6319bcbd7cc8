//! Audit Store Adapter
//!
//! Loads and saves the whole audit collection, either against a shared
//! endpoint or against the local key-value table. `save_all` always replaces
//! the full collection; there is no merge with concurrent writers.

pub mod local;
pub mod protocol;
pub mod remote;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::engine::config::Config;
use crate::engine::database::DatabaseError;
use crate::engine::model::AuditRecord;

pub use local::LocalStore;
pub use remote::RemoteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Message reported by the endpoint, or `Request failed (<status>)`.
    #[error("{0}")]
    Remote(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Short human-readable backend description.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<AuditRecord>>;

    async fn save_all(&self, records: &[AuditRecord]) -> Result<()>;

    /// Insert or replace one record by id.
    async fn upsert(&self, record: &AuditRecord) -> Result<()> {
        let mut records = self.load().await?;
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.save_all(&records).await
    }

    /// Remove the record with `id`. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_all(&records).await?;
        Ok(true)
    }
}

/// Pick the backend for a project: the endpoint when one is configured,
/// otherwise the local database.
pub fn open_store(config: &Config, project_dir: &Path) -> Result<Box<dyn AuditStore>> {
    match config.store.resolved_endpoint() {
        Some(endpoint) => Ok(Box::new(RemoteStore::new(endpoint))),
        None => {
            let store = LocalStore::open(
                &config.database_path(project_dir),
                &config.store.storage_key,
            )?;
            Ok(Box::new(store))
        }
    }
}
