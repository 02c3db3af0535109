//! Client-side narrowing of listed records by status, branch and free text.

use serde_json::Value;

use super::Resource;

/// Filters applied to a fetched list. Empty fields match everything.
///
/// All comparisons are case-insensitive substring matches, so `--status act`
/// matches "Active".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<String>,
    pub branch: Option<String>,
    pub search: Option<String>,
}

impl ListFilter {
    pub fn is_empty(&self) -> bool {
        [&self.status, &self.branch, &self.search]
            .iter()
            .all(|field| needle(field).is_none())
    }

    pub fn matches<R: Resource>(&self, item: &R) -> bool {
        field_matches(item.status(), &self.status)
            && field_matches(item.branch(), &self.branch)
            && self.search_matches(item)
    }

    pub fn apply<R: Resource>(&self, items: Vec<R>) -> Vec<R> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    /// Free text matches any top-level field value of the record
    fn search_matches<R: Resource>(&self, item: &R) -> bool {
        let Some(needle) = needle(&self.search) else {
            return true;
        };
        let Ok(Value::Object(fields)) = serde_json::to_value(item) else {
            return false;
        };
        fields.values().any(|value| {
            let text = match value {
                Value::String(s) => s.to_lowercase(),
                other => other.to_string().to_lowercase(),
            };
            text.contains(&needle)
        })
    }
}

fn needle(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// A record without the field never matches a non-empty filter
fn field_matches(value: Option<&str>, filter: &Option<String>) -> bool {
    match needle(filter) {
        None => true,
        Some(needle) => value
            .map(|v| v.to_lowercase().contains(&needle))
            .unwrap_or(false),
    }
}
