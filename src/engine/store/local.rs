//! Local key-value backend
//! One key holds the JSON-encoded audit array

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

use super::{AuditStore, Result};
use crate::engine::database::Database;
use crate::engine::model::AuditRecord;

pub struct LocalStore {
    db: Database,
    key: String,
}

impl LocalStore {
    pub fn new(db: Database, key: &str) -> Self {
        Self {
            db,
            key: key.to_string(),
        }
    }

    pub fn open(db_path: &Path, key: &str) -> Result<Self> {
        Ok(Self::new(Database::new(db_path)?, key))
    }

    pub fn in_memory(key: &str) -> Result<Self> {
        Ok(Self::new(Database::in_memory()?, key))
    }

    /// Raw stored string, exactly as written.
    pub async fn raw(&self) -> Result<Option<String>> {
        let db = self.db.clone();
        let key = self.key.clone();
        Ok(tokio::task::spawn_blocking(move || db.get_value(&key)).await??)
    }

    pub async fn write_raw(&self, value: String) -> Result<()> {
        let db = self.db.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || db.set_value(&key, &value)).await??;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for LocalStore {
    fn describe(&self) -> String {
        format!("local ({})", self.key)
    }

    async fn load(&self) -> Result<Vec<AuditRecord>> {
        let raw = self.raw().await?;
        let records = parse_collection(raw.as_deref());
        debug!(key = %self.key, count = records.len(), "loaded local audits");
        Ok(records)
    }

    async fn save_all(&self, records: &[AuditRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.write_raw(json).await?;
        debug!(key = %self.key, count = records.len(), "saved local audits");
        Ok(())
    }
}

/// Absent, `null`, unparseable or non-array data reads as an empty collection.
/// Elements of a valid array are always kept, whatever their shape.
fn parse_collection(raw: Option<&str>) -> Vec<AuditRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Option<Vec<AuditRecord>>>(raw) {
        Ok(records) => records.unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "stored audit list is not a JSON array, starting empty");
            Vec::new()
        }
    }
}
