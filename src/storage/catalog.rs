use super::FormSnapshot;
use itertools::Itertools;
use std::cmp::Reverse;

/// How a list of saved forms is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    /// Alphabetically by name, ignoring case.
    Name,
    /// Most fields first.
    FieldCount,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "newest" | "date" => Some(SortOrder::Newest),
            "name" => Some(SortOrder::Name),
            "fields" | "field-count" => Some(SortOrder::FieldCount),
            _ => None,
        }
    }
}

/// A search and sort over saved forms.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    search: String,
    sort: SortOrder,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps forms whose name or any field label contains `term`, ignoring case.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn sort(mut self, order: SortOrder) -> Self {
        self.sort = order;
        self
    }

    pub fn matches(&self, form: &FormSnapshot) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        form.name.to_lowercase().contains(&term)
            || form
                .fields
                .iter()
                .any(|f| f.label().to_lowercase().contains(&term))
    }

    /// Filters and orders `forms`. Sorting is stable.
    pub fn apply<'a>(&self, forms: &'a [FormSnapshot]) -> Vec<&'a FormSnapshot> {
        let matching = forms.iter().filter(|f| self.matches(f));
        match self.sort {
            SortOrder::Newest => matching.sorted_by_key(|f| Reverse(f.created_at)).collect(),
            SortOrder::Name => matching.sorted_by_key(|f| f.name.to_lowercase()).collect(),
            SortOrder::FieldCount => matching
                .sorted_by_key(|f| Reverse(f.field_count()))
                .collect(),
        }
    }
}
