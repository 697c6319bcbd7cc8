//! View/Controller
//!
//! Applies user actions to the in-memory [`AppState`] and persists after
//! every mutation. In `replace_all` sync mode the whole collection is
//! re-saved; in `keyed` mode only the touched record (or deleted id) is sent.
//! A failed save leaves the in-memory change in place and reports the error.

use thiserror::Error;
use tracing::info;

use super::config::{AppMode, SyncMode};
use super::model::{
    validate_note_text, validate_period, AuditEdit, AuditRecord, NewAudit, NoteInput,
    ValidationError,
};
use super::state::AppState;
use super::store::{AuditStore, StoreError};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Load failed: {0}")]
    Load(StoreError),

    #[error("Save failed: {0}")]
    Save(StoreError),

    #[error("Audit not found: {0}")]
    AuditNotFound(String),

    #[error("Audit {id} has no note #{number}")]
    NoteNotFound { id: String, number: usize },

    #[error("This register is open in view mode; changes are disabled")]
    ReadOnly,
}

pub type Result<T> = std::result::Result<T, ControllerError>;

enum Change {
    Upsert(String),
    Delete(String),
}

pub struct Controller {
    store: Box<dyn AuditStore>,
    state: AppState,
    mode: AppMode,
    sync_mode: SyncMode,
}

impl Controller {
    pub fn new(store: Box<dyn AuditStore>) -> Self {
        Self {
            store,
            state: AppState::default(),
            mode: AppMode::Manage,
            sync_mode: SyncMode::ReplaceAll,
        }
    }

    pub fn with_mode(mut self, mode: AppMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn store_description(&self) -> String {
        self.store.describe()
    }

    pub fn set_filter(&mut self, year: Option<&str>) {
        self.state.set_filter(year);
    }

    pub fn filtered(&self) -> Vec<&AuditRecord> {
        self.state.filtered()
    }

    /// Reload the collection from the store.
    pub async fn refresh(&mut self) -> Result<()> {
        let items = self.store.load().await.map_err(ControllerError::Load)?;
        info!(count = items.len(), store = %self.store.describe(), "audits loaded");
        self.state.replace_items(items);
        Ok(())
    }

    pub async fn add_audit(&mut self, input: NewAudit) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let record = input.into_record()?;
        info!(id = %record.id, year = %record.year, "adding audit");

        self.state.items.push(record.clone());
        self.persist(Change::Upsert(record.id.clone())).await?;
        Ok(record)
    }

    pub async fn add_reaudit(&mut self, id: &str, period: &str) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let period = validate_period(period)?;

        let record = self.record_mut(id)?;
        record.push_reaudit(&period);
        let updated = record.clone();
        info!(id, period = %period, "re-audit added");

        self.persist(Change::Upsert(id.to_string())).await?;
        Ok(updated)
    }

    pub async fn add_note(&mut self, id: &str, input: NoteInput) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let note = input.into_note()?;

        let record = self.record_mut(id)?;
        record.push_note(note);
        let updated = record.clone();
        info!(id, notes = updated.notes.len(), "note added");

        self.persist(Change::Upsert(id.to_string())).await?;
        Ok(updated)
    }

    /// Replace the text of note `index` (zero-based).
    pub async fn edit_note(&mut self, id: &str, index: usize, text: &str) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let text = validate_note_text(text)?;

        let record = self.record_mut(id)?;
        let note = record
            .notes
            .get_mut(index)
            .ok_or_else(|| ControllerError::NoteNotFound {
                id: id.to_string(),
                number: index + 1,
            })?;
        note.text = text;
        let updated = record.clone();
        info!(id, index, "note edited");

        self.persist(Change::Upsert(id.to_string())).await?;
        Ok(updated)
    }

    /// Remove note `index` (zero-based); later notes keep their order.
    pub async fn delete_note(&mut self, id: &str, index: usize) -> Result<AuditRecord> {
        self.ensure_writable()?;

        let record = self.record_mut(id)?;
        if index >= record.notes.len() {
            return Err(ControllerError::NoteNotFound {
                id: id.to_string(),
                number: index + 1,
            });
        }
        record.notes.remove(index);
        let updated = record.clone();
        info!(id, index, "note deleted");

        self.persist(Change::Upsert(id.to_string())).await?;
        Ok(updated)
    }

    pub async fn edit_audit(&mut self, id: &str, edit: AuditEdit) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let edit = edit.validate()?;

        let record = self.record_mut(id)?;
        edit.apply(record);
        let updated = record.clone();
        info!(id, year = %updated.year, "audit edited");

        self.persist(Change::Upsert(id.to_string())).await?;
        Ok(updated)
    }

    pub async fn delete_audit(&mut self, id: &str) -> Result<AuditRecord> {
        self.ensure_writable()?;
        let removed = self
            .state
            .remove(id)
            .ok_or_else(|| ControllerError::AuditNotFound(id.to_string()))?;
        info!(id, "audit deleted");

        self.persist(Change::Delete(id.to_string())).await?;
        Ok(removed)
    }

    /// Fails with [`ControllerError::ReadOnly`] in view mode.
    pub fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            AppMode::Manage => Ok(()),
            AppMode::View => Err(ControllerError::ReadOnly),
        }
    }

    fn record_mut(&mut self, id: &str) -> Result<&mut AuditRecord> {
        self.state
            .find_mut(id)
            .ok_or_else(|| ControllerError::AuditNotFound(id.to_string()))
    }

    async fn persist(&self, change: Change) -> Result<()> {
        let result = match (self.sync_mode, change) {
            (SyncMode::ReplaceAll, _) => self.store.save_all(&self.state.items).await,
            (SyncMode::Keyed, Change::Upsert(id)) => match self.state.find(&id) {
                Some(record) => self.store.upsert(record).await,
                None => Ok(()),
            },
            (SyncMode::Keyed, Change::Delete(id)) => self.store.delete(&id).await.map(|_| ()),
        };
        result.map_err(ControllerError::Save)
    }
}
