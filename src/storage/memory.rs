use super::{FormSnapshot, FormStore, remove, upsert};
use crate::error::StorageError;

/// A store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    forms: Vec<FormSnapshot>,
    current: Option<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormStore for InMemoryStore {
    fn list(&self) -> Result<Vec<FormSnapshot>, StorageError> {
        Ok(self.forms.clone())
    }

    fn load(&self, id: &str) -> Result<FormSnapshot, StorageError> {
        self.forms
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))
    }

    fn save(&mut self, snapshot: FormSnapshot) -> Result<FormSnapshot, StorageError> {
        let stored = upsert(&mut self.forms, snapshot);
        self.current = Some(stored.id.clone());
        Ok(stored)
    }

    fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        if !remove(&mut self.forms, id) {
            return Err(StorageError::FormNotFound(id.to_string()));
        }
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        Ok(())
    }

    fn current(&self) -> Result<Option<FormSnapshot>, StorageError> {
        match &self.current {
            Some(id) => self.load(id).map(Some),
            None => Ok(None),
        }
    }
}
