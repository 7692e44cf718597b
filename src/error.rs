use crate::formula::Value;
use crate::form::{FieldId, FieldType};
use thiserror::Error;

/// A field definition or workspace edit violates a structural invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Field id must not be empty")]
    EmptyFieldId,

    #[error("Field '{label}' is derived and cannot also be required")]
    RequiredDerived { label: String },

    #[error("Derived field '{label}' cannot carry {setting}")]
    DerivedWithInputSetting {
        label: String,
        setting: &'static str,
    },

    #[error("Field '{label}' of type {field_type} needs at least one option")]
    MissingOptions { label: String, field_type: FieldType },

    #[error("Field '{label}' of type {field_type} does not take options")]
    UnexpectedOptions { label: String, field_type: FieldType },

    #[error("Derived field '{label}' has an empty formula")]
    EmptyFormula { label: String },

    #[error("Derived field '{label}' must reference at least one parent field")]
    NoParents { label: String },

    #[error("Field '{label}' cannot derive its value from itself")]
    SelfReference { label: String },

    #[error("Field '{label}' has a minimum length of {min}, above its maximum length of {max}")]
    InvalidLengthRange { label: String, min: usize, max: usize },

    #[error("Another field is already labelled '{0}'")]
    DuplicateLabel(String),

    #[error("Field id '{0}' appears more than once in the form")]
    DuplicateFieldId(FieldId),

    #[error("Field '{label}' references parent '{parent_id}', which is not part of the form")]
    UnknownParent { label: String, parent_id: FieldId },

    #[error("Field '{0}' does not exist in the form")]
    UnknownField(FieldId),

    #[error("Cannot move field from position {from} to {to} in a form of {len} fields")]
    InvalidReorder { from: usize, to: usize, len: usize },

    #[error("Field '{label}' is not a derived field")]
    NotDerived { label: String },

    #[error("A form needs a name before it can be saved")]
    EmptyFormName,

    #[error(transparent)]
    Cyclic(#[from] CyclicDependencyError),
}

/// Derived fields that transitively depend on themselves.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Derived fields form a dependency cycle: {}", .labels.join(" -> "))]
pub struct CyclicDependencyError {
    /// Ids along the cycle; the first id is repeated at the end.
    pub field_ids: Vec<FieldId>,
    /// Display labels matching `field_ids`.
    pub labels: Vec<String>,
}

/// Errors raised while parsing or evaluating a formula expression.
///
/// These never leave the formula evaluator; they are folded into the
/// `"Error in formula"` marker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Unknown name '{0}'")]
    UnknownName(String),

    #[error("Unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Function '{function}' takes {expected} argument(s), but received {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is not a valid date")]
    InvalidDate(String),

    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result of '{0}' is not a finite number")]
    NonFinite(String),
}

/// Misuse of a form-fill session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Field '{0}' does not exist in this form")]
    UnknownField(FieldId),

    #[error("Field '{label}' is derived and cannot be edited directly")]
    DerivedFieldNotEditable { label: String },

    #[error("The form has already been submitted; reset it before editing")]
    AlreadySubmitted,

    #[error("Field id '{0}' appears more than once in the form")]
    DuplicateFieldId(FieldId),

    #[error(transparent)]
    Cyclic(#[from] CyclicDependencyError),
}

/// Errors from a form store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Could not access '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Stored form data is malformed: {0}")]
    Serialization(String),

    #[error("No saved form with id '{0}'")]
    FormNotFound(String),
}

/// Errors raised while ingesting an externally generated form suggestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SuggestionError {
    #[error("Response does not contain a JSON object")]
    NoJson,

    #[error("Invalid suggestion JSON: {0}")]
    InvalidJson(String),

    #[error("Suggested field '{label}' has an unsupported type: '{type_name}'")]
    UnknownFieldType { label: String, type_name: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
