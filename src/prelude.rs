//! Prelude module for convenient imports
//!
//! Re-exports the types needed to compose, fill and persist a form.
//!
//! # Example
//!
//! ```rust,no_run
//! use formwork::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let snapshot = FormSnapshot::from_file("path/to/form.json")?;
//! let workspace = FormWorkspace::from_snapshot(snapshot)?;
//! let mut runtime = workspace.runtime()?;
//!
//! let values = ValueSheet::from_file("path/to/values.json")?;
//! values.apply_to(&mut runtime)?;
//!
//! for view in runtime.views() {
//!     println!("{}: {}", view.label, view.value);
//! }
//! # Ok(())
//! # }
//! ```

// Field model and workspace
pub use crate::form::{
    DerivedConfig, Field, FieldBuilder, FieldId, FieldKind, FieldType, FieldValue, FormDraft,
    FormSuggestion, FormWorkspace, FormulaSuggestion, IntoForm, ValidationRules,
};

// Evaluation
pub use crate::formula::{DerivedValue, ERROR_MARKER, FormulaEvaluator};
pub use crate::resolver::{DependencyGraph, ResolutionWarning};
pub use crate::runtime::{
    FieldView, FormRuntime, RecomputePolicy, SessionState, Submission, SubmitOutcome,
};
pub use crate::validation::{FieldErrors, validate};

// Data and storage
pub use crate::data::ValueSheet;
pub use crate::storage::{
    CatalogQuery, FormSnapshot, FormStore, InMemoryStore, JsonFileStore, SortOrder,
};

// Error types
pub use crate::error::{
    ConfigurationError, CyclicDependencyError, RuntimeError, StorageError, SuggestionError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
