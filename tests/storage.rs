//! Tests for the form stores and the saved-form catalog.
mod common;
use common::*;
use formwork::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;

fn sample_forms() -> Vec<FormSnapshot> {
    let (price, qty, total) = order_fields();
    vec![
        snapshot(
            "order",
            "Order",
            vec![price, qty, total],
            timestamp(2024, 3, 1),
        ),
        snapshot(
            "contact",
            "contact us",
            vec![text_field("Email")],
            timestamp(2024, 5, 1),
        ),
        snapshot(
            "survey",
            "Birthday survey",
            vec![date_field("Date of Birth"), text_field("Comment")],
            timestamp(2023, 12, 24),
        ),
    ]
}

/// Behaviour every store must share.
fn exercise_store(store: &mut impl FormStore) {
    assert!(store.list().unwrap().is_empty());
    assert_eq!(store.current().unwrap(), None);

    let forms = sample_forms();
    for form in &forms {
        store.save(form.clone()).unwrap();
    }
    assert_eq!(store.list().unwrap(), forms);
    assert_eq!(store.current().unwrap().map(|f| f.id), Some("survey".to_string()));

    // Re-saving keeps the first creation time and the list position.
    let mut edited = forms[0].clone();
    edited.name = "Order (edited)".into();
    edited.created_at = timestamp(2030, 1, 1);
    let stored = store.save(edited).unwrap();
    assert_eq!(stored.created_at, timestamp(2024, 3, 1));
    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].name, "Order (edited)");
    assert_eq!(store.load("order").unwrap(), stored);
    assert_eq!(store.current().unwrap(), Some(stored));

    // Deleting another form keeps the current pointer.
    store.delete("contact").unwrap();
    assert_eq!(store.current().unwrap().map(|f| f.id), Some("order".to_string()));

    // Deleting the current form clears it.
    store.delete("order").unwrap();
    assert_eq!(store.current().unwrap(), None);
    assert_eq!(store.list().unwrap().len(), 1);

    assert_eq!(
        store.delete("order").unwrap_err(),
        StorageError::FormNotFound("order".into())
    );
    assert_eq!(
        store.load("missing").unwrap_err(),
        StorageError::FormNotFound("missing".into())
    );
}

#[test]
fn test_in_memory_store() {
    exercise_store(&mut InMemoryStore::new());
}

#[test]
fn test_json_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonFileStore::open(dir.path().join("forms")).unwrap();
    exercise_store(&mut store);
}

#[test]
fn test_json_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let forms = sample_forms();
    {
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.save(forms[1].clone()).unwrap();
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(store.list().unwrap(), vec![forms[1].clone()]);
    assert_eq!(store.current().unwrap(), Some(forms[1].clone()));
    assert!(dir.path().join("saved_forms.json").exists());
    assert!(dir.path().join("current_form.json").exists());
}

#[test]
fn test_json_file_store_reports_corrupt_data() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("saved_forms.json"), "{ this is not json").unwrap();

    let store = JsonFileStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.list(),
        Err(StorageError::Serialization(_))
    ));
}

#[test]
fn test_delete_with_corrupt_current_form_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let forms = sample_forms();
    let mut store = JsonFileStore::open(dir.path()).unwrap();
    store.save(forms[0].clone()).unwrap();
    store.save(forms[1].clone()).unwrap();
    fs::write(dir.path().join("current_form.json"), "not json").unwrap();

    assert!(matches!(
        store.delete("order"),
        Err(StorageError::Serialization(_))
    ));
    assert_eq!(store.list().unwrap(), vec![forms[0].clone(), forms[1].clone()]);
}

#[test]
fn test_snapshot_json_shape() {
    let form = &sample_forms()[1];
    let json: serde_json::Value = serde_json::from_str(&form.to_json().unwrap()).unwrap();
    assert_eq!(json["id"], "contact");
    assert_eq!(json["name"], "contact us");
    assert!(json["createdAt"].as_str().unwrap().starts_with("2024-05-01T12:00:00"));
    assert_eq!(json["fields"][0]["label"], "Email");

    let back = FormSnapshot::from_json(&form.to_json().unwrap()).unwrap();
    assert_eq!(&back, form);
}

#[test]
fn test_snapshot_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form.json");
    let form = sample_forms().remove(0);
    fs::write(&path, form.to_json().unwrap()).unwrap();

    assert_eq!(FormSnapshot::from_file(&path).unwrap(), form);
    assert!(matches!(
        FormSnapshot::from_file(dir.path().join("absent.json")),
        Err(StorageError::Io { .. })
    ));
}

mod catalog {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids<'a>(forms: &[&'a FormSnapshot]) -> Vec<&'a str> {
        forms.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let forms = sample_forms();
        let listed = CatalogQuery::new().apply(&forms);
        assert_eq!(ids(&listed), vec!["contact", "order", "survey"]);
    }

    #[test]
    fn test_sort_by_name_and_field_count() {
        let forms = sample_forms();
        let by_name = CatalogQuery::new().sort(SortOrder::Name).apply(&forms);
        assert_eq!(ids(&by_name), vec!["survey", "contact", "order"]);

        let by_count = CatalogQuery::new().sort(SortOrder::FieldCount).apply(&forms);
        assert_eq!(ids(&by_count), vec!["order", "survey", "contact"]);
    }

    #[test]
    fn test_search_matches_names_and_labels() {
        let forms = sample_forms();
        let by_name = CatalogQuery::new().search("ORDER").apply(&forms);
        assert_eq!(ids(&by_name), vec!["order"]);

        let by_label = CatalogQuery::new().search("birth").apply(&forms);
        assert_eq!(ids(&by_label), vec!["survey"]);

        let none = CatalogQuery::new().search("invoice").apply(&forms);
        assert!(none.is_empty());

        let blank = CatalogQuery::new().search("  ").apply(&forms);
        assert_eq!(blank.len(), 3);
    }

    #[test]
    fn test_sort_order_names() {
        assert_eq!(SortOrder::from_name("date"), Some(SortOrder::Newest));
        assert_eq!(SortOrder::from_name("Name"), Some(SortOrder::Name));
        assert_eq!(SortOrder::from_name("fields"), Some(SortOrder::FieldCount));
        assert_eq!(SortOrder::from_name("size"), None);
    }
}
