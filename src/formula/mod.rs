//! Derived-field formulas.
//!
//! A formula is free text with `{Label}` placeholders. Evaluation substitutes
//! every parent's current value into the text and then classifies the result:
//! text made only of numbers, ISO dates, arithmetic operators and the named
//! date functions (whose arguments may be quoted strings) is parsed and
//! evaluated; anything else is shown verbatim. Nothing is ever executed by a general-purpose interpreter.

use crate::error::FormulaError;
use crate::form::{Field, FieldId, FieldValue, format_number};
use ahash::AHashMap;
use chrono::{Local, NaiveDate};
use regex::{NoExpand, Regex};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

mod engine;
pub mod expression;
pub mod lexer;
pub mod parser;

pub use expression::{Expression, Function, Value};

use engine::FormulaEngine;
use lexer::{is_formula, tokenize};
use parser::Parser;

/// Shown in place of a derived value whose formula could not be evaluated.
pub const ERROR_MARKER: &str = "Error in formula";

static LEFTOVER_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("placeholder pattern is valid"));

/// The outcome of evaluating a derived field.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedValue {
    Number(f64),
    /// Literal display text, or the rendering of a non-numeric result.
    Text(String),
    /// The formula could not be evaluated.
    Failed,
}

impl DerivedValue {
    pub fn is_failed(&self) -> bool {
        matches!(self, DerivedValue::Failed)
    }

    /// Converts into a stored field value; failures become the error marker.
    pub fn into_field_value(self) -> FieldValue {
        match self {
            DerivedValue::Number(n) => FieldValue::Number(n),
            DerivedValue::Text(s) => FieldValue::Text(s),
            DerivedValue::Failed => FieldValue::Text(ERROR_MARKER.to_string()),
        }
    }
}

impl fmt::Display for DerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedValue::Number(n) => write!(f, "{}", format_number(*n)),
            DerivedValue::Text(s) => write!(f, "{}", s),
            DerivedValue::Failed => write!(f, "{}", ERROR_MARKER),
        }
    }
}

impl From<Value> for DerivedValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => DerivedValue::Number(n),
            Value::Date(d) => DerivedValue::Text(d.format("%Y-%m-%d").to_string()),
            Value::Text(s) => DerivedValue::Text(s),
        }
    }
}

/// Evaluates derived-field formulas.
///
/// The evaluator is cheap to clone and holds no per-form state. Unless a
/// reference date is pinned with [`FormulaEvaluatorBuilder::today`], date
/// functions use the local calendar date at evaluation time.
#[derive(Debug, Clone, Default)]
pub struct FormulaEvaluator {
    today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct FormulaEvaluatorBuilder {
    today: Option<NaiveDate>,
}

impl FormulaEvaluatorBuilder {
    /// Pins the reference date used by `yearsSince` and `currentYear`.
    pub fn today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    pub fn build(self) -> FormulaEvaluator {
        FormulaEvaluator { today: self.today }
    }
}

impl FormulaEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FormulaEvaluatorBuilder {
        FormulaEvaluatorBuilder::default()
    }

    /// The reference date for date functions.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Computes the value of a derived field from its parents' current values.
    ///
    /// Never fails: any problem yields [`DerivedValue::Failed`]. Independent
    /// fields evaluate to an empty text.
    pub fn evaluate(
        &self,
        field: &Field,
        fields: &AHashMap<FieldId, Field>,
        values: &AHashMap<FieldId, FieldValue>,
    ) -> DerivedValue {
        let Some(config) = field.derived_config() else {
            return DerivedValue::Text(String::new());
        };

        let mut missing_parent = false;
        let mut substitutions = Vec::with_capacity(config.parent_field_ids.len());
        for parent_id in &config.parent_field_ids {
            match fields.get(parent_id) {
                Some(parent) => {
                    let value = values.get(parent_id).map(|v| v.to_string()).unwrap_or_default();
                    substitutions.push((parent.placeholder(), value));
                }
                None => missing_parent = true,
            }
        }

        let mut text = substitute(&config.formula, &substitutions);
        if missing_parent {
            // The deleted parent's label is unknown, so any reference left over reads as empty.
            text = LEFTOVER_PLACEHOLDER.replace_all(&text, "").into_owned();
        }

        let outcome = self.evaluate_text(&text);
        match &outcome {
            DerivedValue::Failed => warn!(
                field = field.display_name(),
                formula = %config.formula,
                substituted = %text,
                "derived field formula failed"
            ),
            other => debug!(field = field.display_name(), value = %other, "derived field evaluated"),
        }
        outcome
    }

    /// Classifies already-substituted formula text and evaluates it.
    ///
    /// Text outside the formula vocabulary, or blank text, is returned as a
    /// literal. Text inside it is parsed and evaluated; any failure there
    /// yields [`DerivedValue::Failed`].
    pub fn evaluate_text(&self, text: &str) -> DerivedValue {
        if text.trim().is_empty() {
            return DerivedValue::Text(text.to_string());
        }
        let tokens = match tokenize(text) {
            Ok(tokens) if is_formula(&tokens) => tokens,
            _ => return DerivedValue::Text(text.to_string()),
        };
        match Parser::new(&tokens)
            .parse()
            .and_then(|expr| self.evaluate_expression(&expr))
        {
            Ok(value) => value.into(),
            Err(e) => {
                debug!(error = %e, text, "formula evaluation failed");
                DerivedValue::Failed
            }
        }
    }

    /// Evaluates a parsed expression.
    pub fn evaluate_expression(&self, expression: &Expression) -> Result<Value, FormulaError> {
        FormulaEngine::new(expression, self.today()).evaluate()
    }
}

/// Parses formula text that is already free of placeholders.
pub fn parse(text: &str) -> Result<Expression, FormulaError> {
    let tokens = tokenize(text)?;
    Parser::new(&tokens).parse()
}

/// Replaces every occurrence of each placeholder token with its value.
///
/// Tokens are matched literally: regex metacharacters in labels are escaped,
/// and values are inserted without `$` expansion.
pub fn substitute(formula: &str, substitutions: &[(String, String)]) -> String {
    substitutions
        .iter()
        .fold(formula.to_string(), |text, (token, value)| {
            match Regex::new(&regex::escape(token)) {
                Ok(pattern) => pattern.replace_all(&text, NoExpand(value)).into_owned(),
                Err(_) => text.replace(token.as_str(), value),
            }
        })
}

/// A starter formula adding the first two parents, used when no suggestion is available.
pub fn fallback_formula(parents: &[&Field]) -> String {
    match parents {
        [] => String::new(),
        [only] => format!("{} + {}", only.placeholder(), only.placeholder()),
        [first, second, ..] => format!("{} + {}", first.placeholder(), second.placeholder()),
    }
}
