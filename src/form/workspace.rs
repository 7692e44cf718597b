use super::conversion::{FormulaSuggestion, IntoForm};
use super::definition::{Field, FieldId};
use crate::error::{ConfigurationError, RuntimeError, SuggestionError};
use crate::formula::fallback_formula;
use crate::resolver::{DependencyGraph, ResolutionWarning};
use crate::runtime::FormRuntime;
use crate::storage::FormSnapshot;
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// The editable form being composed in a builder.
///
/// Every edit is checked against the whole form before it is applied, so a
/// workspace never holds duplicate ids, duplicate labels or cyclic derived
/// fields. A failed edit leaves the workspace untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormWorkspace {
    form_id: Option<String>,
    name: String,
    fields: Vec<Field>,
    created_at: Option<DateTime<Utc>>,
}

impl FormWorkspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Loads a saved form back as a fresh mutable copy.
    ///
    /// Derived fields whose parents were deleted are accepted; they show up in
    /// [`FormWorkspace::warnings`].
    pub fn from_snapshot(snapshot: FormSnapshot) -> Result<Self, ConfigurationError> {
        check_form(&snapshot.fields)?;
        Ok(Self {
            form_id: Some(snapshot.id),
            name: snapshot.name,
            fields: snapshot.fields,
            created_at: Some(snapshot.created_at),
        })
    }

    /// The id the form is saved under, once it has been saved.
    pub fn form_id(&self) -> Option<&str> {
        self.form_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub fn field_by_label(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label().trim() == label.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends a field to the end of the form.
    pub fn add_field(&mut self, field: Field) -> Result<(), ConfigurationError> {
        if self.field(field.id()).is_some() {
            return Err(ConfigurationError::DuplicateFieldId(field.id().clone()));
        }
        let mut candidate = self.fields.clone();
        candidate.push(field);
        let position = candidate.len() - 1;
        self.commit_edit(candidate, position)
    }

    /// Replaces the field with the same id, keeping its position.
    pub fn update_field(&mut self, field: Field) -> Result<(), ConfigurationError> {
        let position = self
            .position(field.id())
            .ok_or_else(|| ConfigurationError::UnknownField(field.id().clone()))?;
        let mut candidate = self.fields.clone();
        candidate[position] = field;
        self.commit_edit(candidate, position)
    }

    /// Removes a field. Derived fields that referenced it keep the dangling
    /// id and treat the missing parent as empty.
    pub fn delete_field(&mut self, id: &FieldId) -> Result<Field, ConfigurationError> {
        let position = self
            .position(id)
            .ok_or_else(|| ConfigurationError::UnknownField(id.clone()))?;
        let removed = self.fields.remove(position);
        debug!(field = removed.display_name(), "field deleted");
        Ok(removed)
    }

    /// Moves the field at `from` to index `to`.
    pub fn reorder_fields(&mut self, from: usize, to: usize) -> Result<(), ConfigurationError> {
        let len = self.fields.len();
        if from >= len || to >= len {
            return Err(ConfigurationError::InvalidReorder { from, to, len });
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        Ok(())
    }

    /// Replaces every field at once, e.g. with a generated layout.
    pub fn set_fields(&mut self, fields: Vec<Field>) -> Result<(), ConfigurationError> {
        check_form(&fields)?;
        self.fields = fields;
        Ok(())
    }

    /// Applies an externally produced form. On failure the workspace is untouched.
    pub fn apply_draft(&mut self, draft: impl IntoForm) -> Result<(), SuggestionError> {
        let draft = draft.into_form()?;
        check_form(&draft.fields)?;
        if !draft.name.trim().is_empty() {
            self.name = draft.name;
        }
        self.fields = draft.fields;
        debug!(fields = self.fields.len(), "applied form draft");
        Ok(())
    }

    /// Clears the workspace for a brand-new form.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A starter formula over the given parents, used when no suggestion is available.
    pub fn starter_formula(&self, parent_ids: &[FieldId]) -> String {
        let parents: Vec<&Field> = parent_ids.iter().filter_map(|id| self.field(id)).collect();
        fallback_formula(&parents)
    }

    /// Sets a derived field's formula from a suggestion, keeping its parents.
    ///
    /// A blank suggestion falls back to [`starter_formula`](Self::starter_formula).
    /// Returns the formula that was applied; on failure the workspace is untouched.
    pub fn apply_formula(
        &mut self,
        id: &FieldId,
        suggestion: FormulaSuggestion,
    ) -> Result<String, ConfigurationError> {
        let field = self
            .field(id)
            .ok_or_else(|| ConfigurationError::UnknownField(id.clone()))?;
        let parents = field
            .derived_config()
            .ok_or_else(|| ConfigurationError::NotDerived {
                label: field.display_name().to_string(),
            })?
            .parent_field_ids
            .clone();

        let formula = if suggestion.is_blank() {
            self.starter_formula(&parents)
        } else {
            suggestion.formula
        };
        let updated = field.to_builder().derived(parents, formula.clone()).build()?;
        self.update_field(updated)?;
        debug!(field = %id, formula = %formula, "applied suggested formula");
        Ok(formula)
    }

    /// Non-fatal dependency problems in the current field list.
    pub fn warnings(&self) -> Vec<ResolutionWarning> {
        DependencyGraph::build(&self.fields).warnings().to_vec()
    }

    /// Produces the immutable snapshot persisted on save.
    ///
    /// The form id and creation time are assigned on the first save and kept
    /// for every later one.
    pub fn snapshot(&mut self) -> Result<FormSnapshot, ConfigurationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::EmptyFormName);
        }
        let name = name.to_string();
        let id = self
            .form_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        let created_at = *self.created_at.get_or_insert_with(Utc::now);
        Ok(FormSnapshot {
            id,
            name,
            fields: self.fields.clone(),
            created_at,
        })
    }

    /// Starts a fill session over the current fields.
    pub fn runtime(&self) -> Result<FormRuntime, RuntimeError> {
        FormRuntime::new(self.fields.clone())
    }

    fn position(&self, id: &FieldId) -> Option<usize> {
        self.fields.iter().position(|f| f.id() == id)
    }

    /// Checks an edited field list and applies it when it is valid.
    fn commit_edit(
        &mut self,
        candidate: Vec<Field>,
        edited: usize,
    ) -> Result<(), ConfigurationError> {
        let field = &candidate[edited];
        for parent_id in field.parent_ids() {
            if !candidate.iter().any(|f| f.id() == parent_id) {
                return Err(ConfigurationError::UnknownParent {
                    label: field.display_name().to_string(),
                    parent_id: parent_id.clone(),
                });
            }
        }
        check_form(&candidate)?;
        self.fields = candidate;
        Ok(())
    }
}

/// Whole-form checks: unique ids, unique non-blank labels, no cycles.
fn check_form(fields: &[Field]) -> Result<(), ConfigurationError> {
    let mut ids = AHashSet::with_capacity(fields.len());
    let mut labels = AHashSet::with_capacity(fields.len());
    for field in fields {
        if !ids.insert(field.id()) {
            return Err(ConfigurationError::DuplicateFieldId(field.id().clone()));
        }
        let label = field.label().trim();
        if !label.is_empty() && !labels.insert(label) {
            return Err(ConfigurationError::DuplicateLabel(label.to_string()));
        }
    }
    DependencyGraph::build(fields).order()?;
    Ok(())
}
