//! Collection-wide shopping list consistency sweep.
//!
//! # Responsibility
//! - Report which containers hold shopping lists that sanitization would
//!   change, without changing them.
//!
//! # Invariants
//! - Input is never mutated.
//! - A container is counted as invalid iff `sanitize_categories` warns on
//!   its list.

use crate::model::shopping::Container;
use crate::sync::sanitize::sanitize_categories;
use log::{info, warn};

/// One container whose stored list does not sanitize cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyIssue {
    pub container_id: String,
    pub title: String,
    pub warnings: Vec<String>,
}

/// Outcome of `check_consistency`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsistencyReport {
    pub total_containers: usize,
    pub containers_with_shopping_list: usize,
    pub containers_with_invalid_data: usize,
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks every non-empty shopping list in `collection`.
pub fn check_consistency(collection: &[Container]) -> ConsistencyReport {
    let mut report = ConsistencyReport {
        total_containers: collection.len(),
        ..ConsistencyReport::default()
    };

    for container in collection {
        if container.shopping_list.is_empty() {
            continue;
        }
        report.containers_with_shopping_list += 1;

        let sanitized = sanitize_categories(&container.shopping_list);
        if sanitized.is_valid {
            continue;
        }
        warn!(
            "event=consistency_issue module=sync status=warn container_id={} warnings={}",
            container.id,
            sanitized.warnings.len()
        );
        report.containers_with_invalid_data += 1;
        report.issues.push(ConsistencyIssue {
            container_id: container.id.clone(),
            title: container.title.clone(),
            warnings: sanitized.warnings,
        });
    }

    info!(
        "event=consistency_check module=sync status=ok total={} with_list={} invalid={}",
        report.total_containers,
        report.containers_with_shopping_list,
        report.containers_with_invalid_data
    );
    report
}

#[cfg(test)]
mod tests {
    use super::check_consistency;
    use crate::model::shopping::{Category, Container, Item};

    #[test]
    fn empty_collection_is_consistent() {
        let report = check_consistency(&[]);
        assert_eq!(report.total_containers, 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn reports_only_containers_whose_list_needs_sanitizing() {
        let mut clean = Container::new("t1", "Groceries");
        let mut dairy = Category::with_id("c1", "Dairy");
        dairy.items.push(Item::new("i1", "Milk", 2.5, 2));
        clean.shopping_list.push(dairy);

        let mut broken = Container::new("t2", "Party");
        let mut drinks = Category::with_id("c2", "Drinks");
        drinks.items.push(Item::new("i2", "Soda", -1.0, 3));
        drinks.items.push(Item::new("i3", "", 1.0, 1));
        broken.shopping_list.push(drinks);

        let collection = vec![clean, broken, Container::new("t3", "Hardware")];
        let before = collection.clone();
        let report = check_consistency(&collection);

        assert_eq!(collection, before);
        assert_eq!(report.total_containers, 3);
        assert_eq!(report.containers_with_shopping_list, 2);
        assert_eq!(report.containers_with_invalid_data, 1);
        assert!(!report.is_consistent());
        let issue = &report.issues[0];
        assert_eq!(issue.container_id, "t2");
        assert_eq!(issue.title, "Party");
        assert_eq!(issue.warnings.len(), 2);
    }
}
