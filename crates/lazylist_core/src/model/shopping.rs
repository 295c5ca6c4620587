//! Shopping list domain model.
//!
//! # Responsibility
//! - Define `Container`, `Category` and `Item` records.
//! - Provide constructors and read-only projections (`ShoppingSummary`).
//!
//! # Invariants
//! - `Category::new` always synthesizes a fresh UUID v4 id.
//! - Descriptive container fields are passed through opaquely by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a container (task/mission) as issued by the backend.
pub type ContainerId = String;

/// Leaf entry of a shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Unit price; must be finite and `>= 0` to be persisted.
    pub price: f64,
    /// Whole units; must be `>= 0` to be persisted. Fractional quantities on
    /// the wire are rejected by `sanitize_raw` rather than truncated.
    pub quantity: i64,
    #[serde(default)]
    pub completed: bool,
}

impl Item {
    /// Creates an incomplete item with a caller-provided id.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            completed: false,
        }
    }

    /// Creates an incomplete item with a generated UUID v4 id.
    pub fn with_generated_id(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self::new(Uuid::new_v4().to_string(), name, price, quantity)
    }

    /// Line total (`price * quantity`).
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Named group of items inside one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Category {
    /// Synthesizes an empty category with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name)
    }

    /// Creates an empty category with a caller-provided id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Returns the position of the item with `item_id`.
    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == item_id)
    }
}

/// Top-level owner of a shopping list (a task/mission in the host app).
///
/// Only `id` and `shopping_list` are interpreted by the sync engine; the
/// remaining fields are forwarded unchanged into every update document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recursion: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub shopping_list: Vec<Category>,
}

impl Container {
    /// Creates a container with an empty shopping list.
    pub fn new(id: impl Into<ContainerId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: None,
            priority: None,
            due_date: None,
            recursion: None,
            category: None,
            tags: Vec::new(),
            shopping_list: Vec::new(),
        }
    }

    pub fn category_by_id(&self, category_id: &str) -> Option<&Category> {
        self.shopping_list
            .iter()
            .find(|category| category.id == category_id)
    }
}

/// Aggregate counters over one shopping list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShoppingSummary {
    pub categories: usize,
    pub items: usize,
    pub completed_items: usize,
    pub total_cost: f64,
}

impl ShoppingSummary {
    pub fn of(categories: &[Category]) -> Self {
        let items = categories.iter().flat_map(|category| category.items.iter());
        let mut summary = Self {
            categories: categories.len(),
            items: 0,
            completed_items: 0,
            total_cost: 0.0,
        };
        for item in items {
            summary.items += 1;
            if item.completed {
                summary.completed_items += 1;
            }
            summary.total_cost += item.line_total();
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Container, Item, ShoppingSummary};

    #[test]
    fn category_new_generates_distinct_ids() {
        let first = Category::new("Dairy");
        let second = Category::new("Dairy");
        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn container_serializes_wire_names() {
        let mut container = Container::new("42", "Groceries");
        container.shopping_list.push(Category::with_id("c1", "Dairy"));
        let value = serde_json::to_value(&container).expect("container should serialize");
        assert!(value.get("shoppingList").is_some());
        assert!(value.get("dueDate").is_some());
        assert!(value.get("shopping_list").is_none());
    }

    #[test]
    fn item_completed_defaults_to_false_when_missing() {
        let item: Item =
            serde_json::from_str(r#"{"id":"i1","name":"Milk","price":2.5,"quantity":2}"#)
                .expect("item should deserialize");
        assert!(!item.completed);
    }

    #[test]
    fn summary_counts_items_and_cost() {
        let mut dairy = Category::with_id("c1", "Dairy");
        dairy.items.push(Item::new("i1", "Milk", 2.5, 2));
        let mut done = Item::new("i2", "Butter", 4.0, 1);
        done.completed = true;
        dairy.items.push(done);

        let summary = ShoppingSummary::of(&[dairy]);
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.completed_items, 1);
        assert!((summary.total_cost - 9.0).abs() < f64::EPSILON);
    }
}
