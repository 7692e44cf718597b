//! Persistence of saved forms.
//!
//! The engine only produces and consumes [`FormSnapshot`]s; where they live is
//! up to the [`FormStore`] implementation.

use crate::error::StorageError;
use crate::form::Field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod catalog;
pub mod file;
pub mod memory;

pub use catalog::{CatalogQuery, SortOrder};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;

/// An immutable saved form: `{ id, name, fields, createdAt }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub id: String,
    pub name: String,
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
}

impl FormSnapshot {
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Loads a snapshot from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        Self::from_json(&content)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A collection of saved forms plus a pointer to the active one.
pub trait FormStore {
    /// All saved forms in insertion order.
    fn list(&self) -> Result<Vec<FormSnapshot>, StorageError>;

    fn load(&self, id: &str) -> Result<FormSnapshot, StorageError>;

    /// Inserts or replaces the form with the same id and marks it active.
    ///
    /// Replacing keeps the stored `createdAt`. Returns the snapshot as stored.
    fn save(&mut self, snapshot: FormSnapshot) -> Result<FormSnapshot, StorageError>;

    /// Removes a saved form, clearing the active pointer if it pointed there.
    fn delete(&mut self, id: &str) -> Result<(), StorageError>;

    /// The active form, if any.
    fn current(&self) -> Result<Option<FormSnapshot>, StorageError>;
}

/// Upserts `snapshot` into `forms`, returning the stored version.
pub(crate) fn upsert(forms: &mut Vec<FormSnapshot>, mut snapshot: FormSnapshot) -> FormSnapshot {
    match forms.iter_mut().find(|f| f.id == snapshot.id) {
        Some(existing) => {
            snapshot.created_at = existing.created_at;
            *existing = snapshot.clone();
        }
        None => forms.push(snapshot.clone()),
    }
    snapshot
}

/// Removes the form with `id`, reporting whether it existed.
pub(crate) fn remove(forms: &mut Vec<FormSnapshot>, id: &str) -> bool {
    let before = forms.len();
    forms.retain(|f| f.id != id);
    forms.len() != before
}

pub(crate) fn io_error(path: &Path, error: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
