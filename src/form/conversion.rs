use super::definition::{Field, FieldType, ValidationRules};
use crate::error::SuggestionError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON block pattern is valid"));

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("code fence pattern is valid")
});

/// A named list of validated fields, ready to be applied to a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A trait for external form descriptions that can be turned into a [`FormDraft`].
///
/// This is the seam between generated or imported form layouts and the
/// workspace: implement it for your own structs and hand the result to
/// [`FormWorkspace::apply_draft`](super::FormWorkspace::apply_draft).
///
/// # Example
///
/// ```rust
/// use formwork::form::{Field, FieldType, FormDraft, IntoForm};
/// use formwork::error::SuggestionError;
///
/// struct Survey {
///     title: String,
///     questions: Vec<String>,
/// }
///
/// impl IntoForm for Survey {
///     fn into_form(self) -> Result<FormDraft, SuggestionError> {
///         let mut fields = Vec::new();
///         for question in self.questions {
///             fields.push(Field::builder(FieldType::Textarea).label(question).build()?);
///         }
///         Ok(FormDraft { name: self.title, fields })
///     }
/// }
///
/// let draft = Survey {
///     title: "Feedback".to_string(),
///     questions: vec!["What went well?".to_string()],
/// }
/// .into_form()
/// .unwrap();
/// assert_eq!(draft.fields.len(), 1);
/// ```
pub trait IntoForm {
    /// Consumes the description and converts it into validated fields.
    fn into_form(self) -> Result<FormDraft, SuggestionError>;
}

impl IntoForm for FormDraft {
    fn into_form(self) -> Result<FormDraft, SuggestionError> {
        Ok(self)
    }
}

/// A form layout proposed by a text-generation model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSuggestion {
    #[serde(default)]
    pub form_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<SuggestedField>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuggestedField {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation: Option<ValidationRules>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl FormSuggestion {
    /// Extracts the first `{ ... }` block from a model response and parses it.
    ///
    /// Models often wrap the JSON in prose or code fences; everything outside
    /// the outermost braces is ignored.
    pub fn from_response(response: &str) -> Result<Self, SuggestionError> {
        let block = JSON_BLOCK
            .find(response)
            .ok_or(SuggestionError::NoJson)?
            .as_str();
        serde_json::from_str(block).map_err(|e| SuggestionError::InvalidJson(e.to_string()))
    }
}

impl IntoForm for FormSuggestion {
    fn into_form(self) -> Result<FormDraft, SuggestionError> {
        let fields = self
            .fields
            .into_iter()
            .map(|suggested| {
                let field_type = FieldType::from_name(&suggested.type_name).ok_or_else(|| {
                    SuggestionError::UnknownFieldType {
                        label: suggested.label.clone(),
                        type_name: suggested.type_name.clone(),
                    }
                })?;
                let mut builder = Field::builder(field_type)
                    .label(suggested.label)
                    .required(suggested.required);
                if let Some(rules) = suggested.validation {
                    builder = builder.validation(rules);
                }
                // Option lists on types that do not take them are dropped rather than rejected.
                if let Some(options) = suggested.options.filter(|_| field_type.requires_options()) {
                    builder = builder.options(options);
                }
                Ok(builder.build()?)
            })
            .collect::<Result<Vec<_>, SuggestionError>>()?;

        Ok(FormDraft {
            name: self.form_name.trim().to_string(),
            fields,
        })
    }
}

/// A derived-field formula proposed by a text-generation model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormulaSuggestion {
    pub formula: String,
}

impl FormulaSuggestion {
    /// Takes the model's reply as the formula, minus surrounding whitespace,
    /// code fences and inline backticks.
    pub fn from_response(response: &str) -> Self {
        let trimmed = response.trim();
        let unfenced = match CODE_FENCE.captures(trimmed) {
            Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
            None => trimmed,
        };
        Self {
            formula: unfenced.trim_matches('`').trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.formula.trim().is_empty()
    }
}
