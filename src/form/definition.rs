use super::value::FieldValue;
use crate::error::ConfigurationError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, stable identifier of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Generates a fresh identifier. Identifiers are never reused.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The widget a field is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl FieldType {
    pub const ALL: [FieldType; 7] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
    ];

    /// Whether the type needs a list of options to choose from.
    pub fn requires_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
        }
    }

    /// Parses a lowercase type name such as `"select"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional named validation rules of an independent field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub email: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub password_rule: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a derived field computes its value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedConfig {
    #[serde(default)]
    pub parent_field_ids: Vec<FieldId>,
    #[serde(default)]
    pub formula: String,
}

/// Whether a field's value comes from the user or from a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Independent {
        required: bool,
        default_value: Option<FieldValue>,
        validation: ValidationRules,
    },
    Derived(DerivedConfig),
}

/// One validated definition unit of a form.
///
/// A `Field` can only be obtained through [`FieldBuilder::build`] or
/// deserialization, both of which enforce the structural invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRecord", into = "FieldRecord")]
pub struct Field {
    id: FieldId,
    field_type: FieldType,
    label: String,
    options: Option<Vec<String>>,
    kind: FieldKind,
}

impl Field {
    pub fn builder(field_type: FieldType) -> FieldBuilder {
        FieldBuilder::new(field_type)
    }

    /// Starts a builder pre-filled with this field, keeping its id.
    pub fn to_builder(&self) -> FieldBuilder {
        FieldBuilder {
            record: FieldRecord::from(self.clone()),
        }
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The label, or the type name when no label was set.
    pub fn display_name(&self) -> &str {
        if self.label.trim().is_empty() {
            self.field_type.as_str()
        } else {
            &self.label
        }
    }

    /// The token other formulas use to reference this field: `{Label}`.
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.display_name())
    }

    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, FieldKind::Derived(_))
    }

    pub fn derived_config(&self) -> Option<&DerivedConfig> {
        match &self.kind {
            FieldKind::Derived(config) => Some(config),
            FieldKind::Independent { .. } => None,
        }
    }

    /// Parent ids of a derived field; empty for independent fields.
    pub fn parent_ids(&self) -> &[FieldId] {
        self.derived_config()
            .map(|c| c.parent_field_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, FieldKind::Independent { required: true, .. })
    }

    pub fn default_value(&self) -> Option<&FieldValue> {
        match &self.kind {
            FieldKind::Independent { default_value, .. } => default_value.as_ref(),
            FieldKind::Derived(_) => None,
        }
    }

    pub fn validation(&self) -> Option<&ValidationRules> {
        match &self.kind {
            FieldKind::Independent { validation, .. } => Some(validation),
            FieldKind::Derived(_) => None,
        }
    }
}

/// The flat wire shape of a field, as stored in form snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default)]
    pub is_derived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_config: Option<DerivedConfig>,
}

impl TryFrom<FieldRecord> for Field {
    type Error = ConfigurationError;

    fn try_from(record: FieldRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(ConfigurationError::EmptyFieldId);
        }
        let id = FieldId(record.id);
        let label = record.label;
        let name = if label.trim().is_empty() {
            record.field_type.to_string()
        } else {
            label.clone()
        };

        let options = normalize_options(record.options);
        match (&options, record.field_type.requires_options()) {
            (None, true) => {
                return Err(ConfigurationError::MissingOptions {
                    label: name,
                    field_type: record.field_type,
                });
            }
            (Some(_), false) => {
                return Err(ConfigurationError::UnexpectedOptions {
                    label: name,
                    field_type: record.field_type,
                });
            }
            _ => {}
        }

        let validation = record.validation.filter(|v| !v.is_empty());
        let default_value = record.default_value.filter(|v| *v != FieldValue::Empty);

        let kind = if record.is_derived {
            if record.required {
                return Err(ConfigurationError::RequiredDerived { label: name });
            }
            if default_value.is_some() {
                return Err(ConfigurationError::DerivedWithInputSetting {
                    label: name,
                    setting: "a default value",
                });
            }
            if validation.is_some() {
                return Err(ConfigurationError::DerivedWithInputSetting {
                    label: name,
                    setting: "validation rules",
                });
            }
            let config = record.derived_config.unwrap_or_default();
            if config.formula.trim().is_empty() {
                return Err(ConfigurationError::EmptyFormula { label: name });
            }
            let parent_field_ids: Vec<FieldId> =
                config.parent_field_ids.into_iter().unique().collect();
            if parent_field_ids.is_empty() {
                return Err(ConfigurationError::NoParents { label: name });
            }
            if parent_field_ids.contains(&id) {
                return Err(ConfigurationError::SelfReference { label: name });
            }
            FieldKind::Derived(DerivedConfig {
                parent_field_ids,
                formula: config.formula,
            })
        } else {
            let validation = validation.unwrap_or_default();
            if let (Some(min), Some(max)) = (validation.min_length, validation.max_length) {
                if min > max {
                    return Err(ConfigurationError::InvalidLengthRange {
                        label: name,
                        min,
                        max,
                    });
                }
            }
            FieldKind::Independent {
                required: record.required,
                default_value,
                validation,
            }
        };

        Ok(Field {
            id,
            field_type: record.field_type,
            label,
            options,
            kind,
        })
    }
}

/// Trims options and drops blank entries; an empty list becomes `None`.
fn normalize_options(options: Option<Vec<String>>) -> Option<Vec<String>> {
    options
        .map(|opts| {
            opts.into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|opts| !opts.is_empty())
}

impl From<Field> for FieldRecord {
    fn from(field: Field) -> Self {
        let mut record = FieldRecord {
            id: field.id.0,
            field_type: field.field_type,
            label: field.label,
            required: false,
            default_value: None,
            options: field.options,
            validation: None,
            is_derived: false,
            derived_config: None,
        };
        match field.kind {
            FieldKind::Independent {
                required,
                default_value,
                validation,
            } => {
                record.required = required;
                record.default_value = default_value;
                record.validation = Some(validation).filter(|v| !v.is_empty());
            }
            FieldKind::Derived(config) => {
                record.is_derived = true;
                record.derived_config = Some(config);
            }
        }
        record
    }
}

/// Builds a validated [`Field`].
///
/// ```rust
/// use formwork::form::{Field, FieldType};
///
/// let price = Field::builder(FieldType::Number).label("Price").build().unwrap();
/// let total = Field::builder(FieldType::Number)
///     .label("Total")
///     .derived([price.id().clone()], "{Price} * 2")
///     .build()
///     .unwrap();
/// assert!(total.is_derived());
/// ```
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    record: FieldRecord,
}

impl FieldBuilder {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            record: FieldRecord {
                id: FieldId::generate().0,
                field_type,
                label: String::new(),
                required: false,
                default_value: None,
                options: None,
                validation: None,
                is_derived: false,
                derived_config: None,
            },
        }
    }

    pub fn id(mut self, id: impl Into<FieldId>) -> Self {
        self.record.id = id.into().0;
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.record.field_type = field_type;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.record.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.record.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.record.default_value = Some(value.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn validation(mut self, rules: ValidationRules) -> Self {
        self.record.validation = Some(rules);
        self
    }

    /// Turns the field into a derived field computed from `parents`.
    pub fn derived<I>(mut self, parents: I, formula: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = FieldId>,
    {
        self.record.is_derived = true;
        self.record.derived_config = Some(DerivedConfig {
            parent_field_ids: parents.into_iter().collect(),
            formula: formula.into(),
        });
        self
    }

    /// Turns a derived field back into an independent one.
    pub fn independent(mut self) -> Self {
        self.record.is_derived = false;
        self.record.derived_config = None;
        self
    }

    pub fn build(self) -> Result<Field, ConfigurationError> {
        Field::try_from(self.record)
    }
}
