//! Deep-copy isolation of caller state.
//!
//! # Responsibility
//! - Produce an owned working copy of one container before any mutation.
//!
//! # Invariants
//! - The returned copy shares no mutable state with the caller's collection;
//!   every entity owns its strings, vectors and timestamps.

use crate::model::shopping::Container;

/// Locates `container_id` in `collection` and returns a deep copy of it.
///
/// Returns `None` when the container is absent.
pub fn snapshot_container(collection: &[Container], container_id: &str) -> Option<Container> {
    collection
        .iter()
        .find(|container| container.id == container_id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::snapshot_container;
    use crate::model::shopping::{Category, Container, Item};
    use chrono::{TimeZone, Utc};

    fn fixture() -> Vec<Container> {
        let mut container = Container::new("t1", "Weekly groceries");
        container.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        container.tags = vec!["home".to_string()];
        let mut dairy = Category::with_id("c1", "Dairy");
        dairy.items.push(Item::new("i1", "Milk", 2.5, 2));
        container.shopping_list.push(dairy);
        vec![container, Container::new("t2", "Other")]
    }

    #[test]
    fn copy_is_structurally_equal() {
        let collection = fixture();
        let copy = snapshot_container(&collection, "t1").expect("container should exist");
        assert_eq!(copy, collection[0]);
    }

    #[test]
    fn mutating_copy_leaves_source_untouched() {
        let collection = fixture();
        let before = collection.clone();

        let mut copy = snapshot_container(&collection, "t1").expect("container should exist");
        copy.shopping_list[0].items[0].completed = true;
        copy.shopping_list[0].items.push(Item::new("i2", "Eggs", 3.0, 12));
        copy.tags.clear();
        copy.due_date = None;

        assert_eq!(collection, before);
    }

    #[test]
    fn missing_container_returns_none() {
        assert!(snapshot_container(&fixture(), "absent").is_none());
    }
}
