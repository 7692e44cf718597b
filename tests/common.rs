//! Common test utilities for building fields, forms and sessions.
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use formwork::prelude::*;

/// The reference date every pinned evaluator uses.
#[allow(dead_code)]
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

/// An evaluator whose "today" is [`reference_date`].
#[allow(dead_code)]
pub fn pinned_evaluator() -> FormulaEvaluator {
    FormulaEvaluator::builder().today(reference_date()).build()
}

#[allow(dead_code)]
pub fn number_field(label: &str) -> Field {
    Field::builder(FieldType::Number).label(label).build().unwrap()
}

#[allow(dead_code)]
pub fn text_field(label: &str) -> Field {
    Field::builder(FieldType::Text).label(label).build().unwrap()
}

#[allow(dead_code)]
pub fn date_field(label: &str) -> Field {
    Field::builder(FieldType::Date).label(label).build().unwrap()
}

/// A field with a fixed id, handy when the id must appear in assertions.
#[allow(dead_code)]
pub fn number_field_with_id(id: &str, label: &str) -> Field {
    Field::builder(FieldType::Number)
        .id(id)
        .label(label)
        .build()
        .unwrap()
}

/// A derived field of the given type computed from `parents`.
#[allow(dead_code)]
pub fn derived_field(field_type: FieldType, label: &str, parents: &[&Field], formula: &str) -> Field {
    Field::builder(field_type)
        .label(label)
        .derived(parents.iter().map(|p| p.id().clone()), formula)
        .build()
        .unwrap()
}

/// A derived field with a fixed id referencing parents by id.
#[allow(dead_code)]
pub fn derived_field_with_ids(id: &str, label: &str, parent_ids: &[&str], formula: &str) -> Field {
    Field::builder(FieldType::Number)
        .id(id)
        .label(label)
        .derived(parent_ids.iter().map(|p| FieldId::from(*p)), formula)
        .build()
        .unwrap()
}

/// `Price`, `Qty` and `Total = {Price} * {Qty}`.
#[allow(dead_code)]
pub fn order_fields() -> (Field, Field, Field) {
    let price = number_field("Price");
    let qty = number_field("Qty");
    let total = derived_field(FieldType::Number, "Total", &[&price, &qty], "{Price} * {Qty}");
    (price, qty, total)
}

/// Starts a session with the pinned evaluator.
#[allow(dead_code)]
pub fn runtime_with(fields: Vec<Field>) -> FormRuntime {
    FormRuntime::builder(fields)
        .evaluator(pinned_evaluator())
        .build()
        .unwrap()
}

#[allow(dead_code)]
pub fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn snapshot(id: &str, name: &str, fields: Vec<Field>, created_at: DateTime<Utc>) -> FormSnapshot {
    FormSnapshot {
        id: id.to_string(),
        name: name.to_string(),
        fields,
        created_at,
    }
}
