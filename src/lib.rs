//! # Formwork - Form Definition and Derived-Field Engine
//!
//! **Formwork** models a form as an ordered list of typed fields, validates user
//! input against per-field rules, and keeps *derived* fields up to date: fields
//! whose value is computed from other fields through a small formula language.
//!
//! ## Core Workflow
//!
//! 1.  **Compose**: Build [`Field`](form::Field)s with `Field::builder` and add them to a
//!     [`FormWorkspace`](form::FormWorkspace), which rejects duplicate labels,
//!     unknown parents and dependency cycles.
//! 2.  **Fill**: Start a [`FormRuntime`](runtime::FormRuntime) from the field list. Every
//!     `set_value` recomputes the derived fields downstream of the edited field,
//!     in dependency order.
//! 3.  **Submit**: `submit` validates every field and either freezes the values
//!     or returns the per-field error messages.
//! 4.  **Persist**: Save a [`FormSnapshot`](storage::FormSnapshot) to any
//!     [`FormStore`](storage::FormStore).
//!
//! Formulas reference other fields as `{Label}`. After substitution, text made
//! of numbers, ISO dates, quoted strings, `+ - * / ( )` and the functions
//! `yearsSince`, `year` and `currentYear` is evaluated; any other text is shown
//! as is. Evaluation failures show the `"Error in formula"` marker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formwork::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let price = Field::builder(FieldType::Number).label("Price").build()?;
//!     let qty = Field::builder(FieldType::Number).label("Qty").build()?;
//!     let total = Field::builder(FieldType::Number)
//!         .label("Total")
//!         .derived([price.id().clone(), qty.id().clone()], "{Price} * {Qty}")
//!         .build()?;
//!
//!     let mut workspace = FormWorkspace::new("Order");
//!     for field in [price.clone(), qty.clone(), total.clone()] {
//!         workspace.add_field(field)?;
//!     }
//!
//!     let mut runtime = workspace.runtime()?;
//!     runtime.set_value(price.id(), 10)?;
//!     runtime.set_value(qty.id(), 3)?;
//!     println!("Total: {}", runtime.value(total.id()));
//!
//!     match runtime.submit()? {
//!         SubmitOutcome::Submitted(submission) => {
//!             println!("Submitted {} values", submission.values.len())
//!         }
//!         SubmitOutcome::Rejected(errors) => println!("{} fields need attention", errors.len()),
//!     }
//!
//!     let mut store = JsonFileStore::open("forms")?;
//!     store.save(workspace.snapshot()?)?;
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod form;
pub mod formula;
pub mod prelude;
pub mod resolver;
pub mod runtime;
pub mod storage;
pub mod validation;
