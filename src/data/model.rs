use crate::error::RuntimeError;
use crate::form::{FieldId, FieldValue};
use crate::runtime::FormRuntime;
use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;

/// Field values to fill into a form, keyed by field label or field id.
///
/// Matches the JSON a front-end would post: `{"Price": 10, "Name": "Ann"}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ValueSheet {
    values: AHashMap<String, FieldValue>,
}

impl ValueSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a value sheet from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let sheet = serde_json::from_str(&content)?;
        Ok(sheet)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sets every value on `runtime`, resolving keys by label first and id second.
    ///
    /// Keys are applied in sorted order so the outcome does not depend on map
    /// iteration order. Stops at the first key that does not name an editable field.
    pub fn apply_to(&self, runtime: &mut FormRuntime) -> Result<(), RuntimeError> {
        for (key, value) in self.values.iter().sorted_by_key(|(key, _)| key.as_str()) {
            let id = runtime
                .find_field(key)
                .map(|f| f.id().clone())
                .ok_or_else(|| RuntimeError::UnknownField(FieldId::from(key.as_str())))?;
            runtime.set_value(&id, value.clone())?;
        }
        Ok(())
    }
}
