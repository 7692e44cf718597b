use super::{FormSnapshot, FormStore, io_error, remove, upsert};
use crate::error::StorageError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

const SAVED_FORMS_FILE: &str = "saved_forms.json";
const CURRENT_FORM_FILE: &str = "current_form.json";

/// Keeps saved forms as JSON files in one directory.
///
/// `saved_forms.json` holds the array of snapshots and `current_form.json`
/// the active one. Missing files read as empty; malformed files are errors.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn saved_path(&self) -> PathBuf {
        self.dir.join(SAVED_FORMS_FILE)
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FORM_FILE)
    }

    fn read_saved(&self) -> Result<Vec<FormSnapshot>, StorageError> {
        match read_optional(&self.saved_path())? {
            Some(content) => serde_json::from_str(&content)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn write_saved(&self, forms: &[FormSnapshot]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(forms)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write(&self.saved_path(), &json)
    }
}

impl FormStore for JsonFileStore {
    fn list(&self) -> Result<Vec<FormSnapshot>, StorageError> {
        self.read_saved()
    }

    fn load(&self, id: &str) -> Result<FormSnapshot, StorageError> {
        self.read_saved()?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))
    }

    fn save(&mut self, snapshot: FormSnapshot) -> Result<FormSnapshot, StorageError> {
        let mut forms = self.read_saved()?;
        let stored = upsert(&mut forms, snapshot);
        self.write_saved(&forms)?;
        write(&self.current_path(), &stored.to_json()?)?;
        info!(form = %stored.id, name = %stored.name, "form saved");
        Ok(stored)
    }

    fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        let mut forms = self.read_saved()?;
        if !remove(&mut forms, id) {
            return Err(StorageError::FormNotFound(id.to_string()));
        }
        let clears_current = self.current()?.is_some_and(|current| current.id == id);
        self.write_saved(&forms)?;

        if clears_current {
            let path = self.current_path();
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
        }
        info!(form = %id, "form deleted");
        Ok(())
    }

    fn current(&self) -> Result<Option<FormSnapshot>, StorageError> {
        read_optional(&self.current_path())?
            .map(|content| FormSnapshot::from_json(&content))
            .transpose()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

fn write(path: &Path, content: &str) -> Result<(), StorageError> {
    fs::write(path, content).map_err(|e| io_error(path, e))
}
