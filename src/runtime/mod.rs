//! Form-fill sessions.
//!
//! A [`FormRuntime`] owns the current value of every field of one form
//! instance. Edits arrive one at a time through `&mut self`; after each edit
//! the derived fields downstream of the edited field are recomputed in
//! dependency order.

use crate::error::RuntimeError;
use crate::form::{Field, FieldId, FieldType, FieldValue};
use crate::formula::FormulaEvaluator;
use crate::resolver::{DependencyGraph, ResolutionWarning};
use crate::validation::{FieldErrors, validate, validate_all};
use ahash::AHashMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

mod view;

pub use view::FieldView;

/// Which derived fields are recomputed after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecomputePolicy {
    /// Only fields transitively downstream of the edited field.
    #[default]
    Scoped,
    /// Every derived field, every time.
    All,
}

/// The lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Submitted,
}

/// The frozen values of a successful submission, in form order.
///
/// Serializes as `{"values": {"<field id>": value, ...}}` with keys in form order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    #[serde(serialize_with = "serialize_in_order")]
    pub values: Vec<(FieldId, FieldValue)>,
}

impl Submission {
    pub fn get(&self, id: &FieldId) -> Option<&FieldValue> {
        self.values.iter().find(|(key, _)| key == id).map(|(_, value)| value)
    }
}

fn serialize_in_order<S: Serializer>(
    values: &[(FieldId, FieldValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(values.iter().map(|(id, value)| (id, value)))
}

/// The result of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(Submission),
    /// Validation failed; the session stays editable.
    Rejected(FieldErrors),
}

/// Configures and creates a [`FormRuntime`].
pub struct FormRuntimeBuilder {
    fields: Vec<Field>,
    evaluator: FormulaEvaluator,
    policy: RecomputePolicy,
}

impl FormRuntimeBuilder {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            evaluator: FormulaEvaluator::default(),
            policy: RecomputePolicy::default(),
        }
    }

    pub fn evaluator(mut self, evaluator: FormulaEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn recompute(mut self, policy: RecomputePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initializes values and computes every derived field once.
    ///
    /// Fails when derived fields form a cycle; nothing is computed in that case.
    pub fn build(self) -> Result<FormRuntime, RuntimeError> {
        let mut by_id = AHashMap::with_capacity(self.fields.len());
        for field in &self.fields {
            if by_id.insert(field.id().clone(), field.clone()).is_some() {
                return Err(RuntimeError::DuplicateFieldId(field.id().clone()));
            }
        }

        let graph = DependencyGraph::build(&self.fields);
        let derived_order = graph.order()?;

        let mut runtime = FormRuntime {
            order: self.fields.iter().map(|f| f.id().clone()).collect(),
            fields: by_id,
            graph,
            derived_order,
            evaluator: self.evaluator,
            policy: self.policy,
            values: AHashMap::new(),
            errors: FieldErrors::new(),
            state: SessionState::Ready,
            submission: None,
        };
        runtime.initialize_values();
        Ok(runtime)
    }
}

/// The state of one in-progress form instance.
#[derive(Debug, Clone)]
pub struct FormRuntime {
    order: Vec<FieldId>,
    fields: AHashMap<FieldId, Field>,
    graph: DependencyGraph,
    derived_order: Vec<FieldId>,
    evaluator: FormulaEvaluator,
    policy: RecomputePolicy,
    values: AHashMap<FieldId, FieldValue>,
    errors: FieldErrors,
    state: SessionState,
    submission: Option<Submission>,
}

impl FormRuntime {
    /// Starts a session with the default evaluator and scoped recomputation.
    pub fn new(fields: Vec<Field>) -> Result<Self, RuntimeError> {
        FormRuntimeBuilder::new(fields).build()
    }

    pub fn builder(fields: Vec<Field>) -> FormRuntimeBuilder {
        FormRuntimeBuilder::new(fields)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Fields in display order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.order.iter().filter_map(|id| self.fields.get(id))
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Finds a field by its label, falling back to its id.
    pub fn find_field(&self, key: &str) -> Option<&Field> {
        self.fields()
            .find(|f| f.label() == key)
            .or_else(|| self.fields.get(&FieldId::from(key)))
    }

    pub fn value(&self, id: &FieldId) -> &FieldValue {
        const EMPTY: &FieldValue = &FieldValue::Empty;
        self.values.get(id).unwrap_or(EMPTY)
    }

    pub fn values(&self) -> &AHashMap<FieldId, FieldValue> {
        &self.values
    }

    pub fn error(&self, id: &FieldId) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Non-fatal dependency problems, such as parents that were deleted.
    pub fn warnings(&self) -> &[ResolutionWarning] {
        self.graph.warnings()
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// Sets the value of an independent field and recomputes its dependents.
    pub fn set_value(
        &mut self,
        id: &FieldId,
        value: impl Into<FieldValue>,
    ) -> Result<(), RuntimeError> {
        if self.state == SessionState::Submitted {
            return Err(RuntimeError::AlreadySubmitted);
        }
        let field = self
            .fields
            .get(id)
            .ok_or_else(|| RuntimeError::UnknownField(id.clone()))?;
        if field.is_derived() {
            return Err(RuntimeError::DerivedFieldNotEditable {
                label: field.display_name().to_string(),
            });
        }

        self.values.insert(id.clone(), value.into());
        self.errors.remove(id);

        let affected = match self.policy {
            RecomputePolicy::Scoped => self.graph.downstream_of(id)?,
            RecomputePolicy::All => self.derived_order.clone(),
        };
        debug!(field = %id, recomputed = affected.len(), "field value changed");
        self.recompute(&affected);
        Ok(())
    }

    /// Validates a single field, e.g. when it loses focus, and stores the result.
    pub fn blur(&mut self, id: &FieldId) -> Result<Option<&str>, RuntimeError> {
        let field = self
            .fields
            .get(id)
            .ok_or_else(|| RuntimeError::UnknownField(id.clone()))?;
        match validate(field, self.value(id)) {
            Some(message) => {
                self.errors.insert(id.clone(), message);
            }
            None => {
                self.errors.remove(id);
            }
        }
        Ok(self.error(id))
    }

    /// Validates every field; submits when all pass.
    pub fn submit(&mut self) -> Result<SubmitOutcome, RuntimeError> {
        if self.state == SessionState::Submitted {
            return Err(RuntimeError::AlreadySubmitted);
        }
        let errors = validate_all(self.fields(), &self.values);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "submission rejected");
            self.errors = errors.clone();
            return Ok(SubmitOutcome::Rejected(errors));
        }

        self.errors.clear();
        let submission = Submission {
            values: self
                .fields()
                .map(|field| (field.id().clone(), self.value(field.id()).clone()))
                .collect(),
        };
        self.submission = Some(submission.clone());
        self.state = SessionState::Submitted;
        info!(fields = submission.values.len(), "form submitted");
        Ok(SubmitOutcome::Submitted(submission))
    }

    /// Discards all input and returns to a fresh `Ready` session.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.submission = None;
        self.state = SessionState::Ready;
        self.initialize_values();
    }

    /// Everything a renderer needs for each field, in display order.
    pub fn views(&self) -> Vec<FieldView> {
        self.fields()
            .map(|field| FieldView {
                id: field.id().clone(),
                label: field.display_name().to_string(),
                field_type: field.field_type(),
                options: field.options().map(<[String]>::to_vec),
                value: self.value(field.id()).clone(),
                error: self.errors.get(field.id()).cloned(),
                is_derived: field.is_derived(),
                required: field.is_required(),
                derived_from: self.derived_from(field),
            })
            .collect()
    }

    fn derived_from(&self, field: &Field) -> Vec<String> {
        field
            .parent_ids()
            .iter()
            .filter_map(|id| self.fields.get(id))
            .map(|parent| parent.display_name().to_string())
            .collect()
    }

    fn initialize_values(&mut self) {
        self.values = self
            .fields()
            .filter(|f| !f.is_derived())
            .map(|f| {
                let value = f
                    .default_value()
                    .cloned()
                    .unwrap_or_else(|| empty_value_for(f.field_type()));
                (f.id().clone(), value)
            })
            .collect();
        let all = self.derived_order.clone();
        self.recompute(&all);
    }

    fn recompute(&mut self, ids: &[FieldId]) {
        for id in ids {
            let Some(field) = self.fields.get(id) else {
                continue;
            };
            let value = self
                .evaluator
                .evaluate(field, &self.fields, &self.values)
                .into_field_value();
            self.values.insert(id.clone(), value);
        }
    }
}

fn empty_value_for(field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::Checkbox => FieldValue::List(Vec::new()),
        _ => FieldValue::Empty,
    }
}
