//! Update document assembly.
//!
//! # Responsibility
//! - Build the fixed-shape replacement document sent to the persist
//!   collaborator.
//!
//! # Invariants
//! - `shopping_list` is always the sanitized form of the container's list.
//! - Descriptive container fields are copied through unchanged.

use crate::model::shopping::{Category, Container};
use crate::sync::sanitize::sanitize_categories;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full-replacement document consumed by `Persister::persist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocument {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub recursion: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub shopping_list: Vec<Category>,
}

/// Builds the update document for `container`.
///
/// Sanitization is re-run here so documents built from any source satisfy
/// the persisted-shape rules.
pub fn build_update_document(container: &Container) -> UpdateDocument {
    let report = sanitize_categories(&container.shopping_list);
    UpdateDocument {
        title: container.title.clone(),
        description: container.description.clone(),
        status: container.status.clone(),
        priority: container.priority.clone(),
        due_date: container.due_date,
        recursion: container.recursion.clone(),
        category: container.category.clone(),
        tags: container.tags.clone(),
        shopping_list: report.sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::build_update_document;
    use crate::model::shopping::{Category, Container, Item};

    #[test]
    fn document_carries_descriptive_fields_and_camel_case_names() {
        let mut container = Container::new("t1", "Groceries");
        container.priority = Some("high".to_string());
        container.tags = vec!["weekly".to_string()];
        let mut dairy = Category::with_id("c1", "Dairy");
        dairy.items.push(Item::new("i1", "Milk", 2.5, 2));
        container.shopping_list.push(dairy);

        let document = build_update_document(&container);
        assert_eq!(document.title, "Groceries");
        assert_eq!(document.priority.as_deref(), Some("high"));

        let value = serde_json::to_value(&document).expect("document should serialize");
        assert_eq!(value["shoppingList"][0]["items"][0]["id"], "i1");
        assert!(value.get("dueDate").is_some());
    }

    #[test]
    fn document_list_is_sanitized_even_for_unsanitized_input() {
        let mut container = Container::new("t1", "Groceries");
        container.shopping_list.push(Category::with_id("c1", "Empty"));
        let mut bad = Category::with_id("c2", "Bad");
        bad.items.push(Item::new("i1", "Milk", -2.0, 1));
        container.shopping_list.push(bad);

        let document = build_update_document(&container);
        assert!(document.shopping_list.is_empty());
    }
}
