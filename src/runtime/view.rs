use crate::form::{FieldId, FieldType, FieldValue};
use serde::Serialize;

/// What a renderer needs to draw one field, without knowing how values are computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub id: FieldId,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub value: FieldValue,
    pub error: Option<String>,
    pub is_derived: bool,
    pub required: bool,
    /// Display names of the parents a derived field is computed from.
    pub derived_from: Vec<String>,
}

impl FieldView {
    /// The helper line shown under the widget: the error, or a note on derived fields.
    pub fn helper_text(&self) -> Option<String> {
        match (&self.error, self.is_derived) {
            (Some(error), _) => Some(error.clone()),
            (None, true) => Some(format!("Derived from: {}", self.derived_from.join(", "))),
            (None, false) => None,
        }
    }
}
