//! Shopping list validation and sanitization.
//!
//! # Responsibility
//! - Drop structurally invalid categories and items before persistence.
//! - Report every dropped entry as a non-fatal warning.
//!
//! # Invariants
//! - Output categories have non-blank `id`/`name` and at least one item.
//! - Output items have non-blank `id`/`name`, finite `price >= 0` and
//!   `quantity >= 0`.
//! - Invalid entries are dropped, never coerced.
//! - `sanitize(sanitize(x)) == sanitize(x)`.

use crate::model::shopping::{Category, Item};
use serde_json::{Map, Value};

/// Result of one sanitization pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SanitizeReport {
    /// `true` iff no warnings were produced.
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub sanitized: Vec<Category>,
}

impl SanitizeReport {
    fn finish(warnings: Vec<String>, sanitized: Vec<Category>) -> Self {
        Self {
            is_valid: warnings.is_empty(),
            warnings,
            sanitized,
        }
    }
}

/// Sanitizes a typed category list.
pub fn sanitize_categories(categories: &[Category]) -> SanitizeReport {
    let mut warnings = Vec::new();
    let mut sanitized = Vec::with_capacity(categories.len());

    for (index, category) in categories.iter().enumerate() {
        let id = category.id.trim();
        let name = category.name.trim();
        if id.is_empty() {
            warnings.push(format!("category at index {index} has an empty id"));
            continue;
        }
        if name.is_empty() {
            warnings.push(format!("category `{id}` has an empty name"));
            continue;
        }

        let items = category
            .items
            .iter()
            .enumerate()
            .filter_map(|(item_index, item)| {
                match check_item(&item.id, &item.name, item.price, item.quantity) {
                    Ok(()) => Some(Item {
                        id: item.id.trim().to_string(),
                        name: item.name.trim().to_string(),
                        price: item.price,
                        quantity: item.quantity,
                        completed: item.completed,
                    }),
                    Err(reasons) => {
                        warnings.push(item_warning(id, item_index, &reasons));
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        if items.is_empty() {
            continue;
        }
        sanitized.push(Category {
            id: id.to_string(),
            name: name.to_string(),
            items,
        });
    }

    SanitizeReport::finish(warnings, sanitized)
}

/// Sanitizes an untyped shopping list, e.g. a document read from the wire.
///
/// `null` is an empty, valid list. Ids may be strings or integers; integer
/// ids are kept as their decimal string. Other values of the wrong JSON type
/// are rejected rather than coerced.
pub fn sanitize_raw(value: &Value) -> SanitizeReport {
    let categories = match value {
        Value::Null => return SanitizeReport::finish(Vec::new(), Vec::new()),
        Value::Array(categories) => categories,
        _ => {
            return SanitizeReport::finish(
                vec!["shopping list must be an array".to_string()],
                Vec::new(),
            )
        }
    };

    let mut warnings = Vec::new();
    let mut typed = Vec::with_capacity(categories.len());
    for (index, raw) in categories.iter().enumerate() {
        if let Some(category) = parse_raw_category(index, raw, &mut warnings) {
            typed.push(category);
        }
    }

    let mut report = sanitize_categories(&typed);
    warnings.append(&mut report.warnings);
    SanitizeReport::finish(warnings, report.sanitized)
}

fn parse_raw_category(index: usize, raw: &Value, warnings: &mut Vec<String>) -> Option<Category> {
    let Some(object) = raw.as_object() else {
        warnings.push(format!("category at index {index} must be an object"));
        return None;
    };
    let id = match raw_id(object) {
        Ok(id) => id,
        Err(reason) => {
            warnings.push(format!("category at index {index}: {reason}"));
            return None;
        }
    };
    let Some(name) = non_empty_str(object, "name") else {
        warnings.push(format!("category `{id}` is missing `name`"));
        return None;
    };
    let raw_items = match object.get("items") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            warnings.push(format!("category `{id}` items must be an array"));
            return None;
        }
        None => {
            warnings.push(format!("category `{id}` is missing `items`"));
            return None;
        }
    };

    let mut category = Category::with_id(id.as_str(), name);
    for (item_index, raw_item) in raw_items.iter().enumerate() {
        match parse_raw_item(raw_item) {
            Ok(item) => category.items.push(item),
            Err(reason) => warnings.push(item_warning(&id, item_index, &[reason])),
        }
    }
    Some(category)
}

fn parse_raw_item(raw: &Value) -> Result<Item, String> {
    let object = raw
        .as_object()
        .ok_or_else(|| "item must be an object".to_string())?;

    let missing = ["id", "name", "price", "quantity"]
        .into_iter()
        .filter(|field| object.get(*field).map_or(true, Value::is_null))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(format!("missing fields: {}", missing.join(", ")));
    }

    let id = raw_id(object)?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| "`name` must be a string".to_string())?;
    let price = object
        .get("price")
        .and_then(Value::as_f64)
        .ok_or_else(|| "`price` must be a number".to_string())?;
    let quantity = object
        .get("quantity")
        .and_then(Value::as_i64)
        .ok_or_else(|| "`quantity` must be an integer".to_string())?;
    let completed = match object.get("completed") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err("`completed` must be a boolean".to_string()),
    };

    Ok(Item {
        id,
        name: name.to_string(),
        price,
        quantity,
        completed,
    })
}

fn check_item(id: &str, name: &str, price: f64, quantity: i64) -> Result<(), Vec<String>> {
    let mut reasons = Vec::new();
    if id.trim().is_empty() {
        reasons.push("empty id".to_string());
    }
    if name.trim().is_empty() {
        reasons.push("empty name".to_string());
    }
    if !price.is_finite() {
        reasons.push(format!("non-finite price {price}"));
    } else if price < 0.0 {
        reasons.push(format!("negative price {price}"));
    }
    if quantity < 0 {
        reasons.push(format!("negative quantity {quantity}"));
    }
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}

fn item_warning(category_id: &str, item_index: usize, reasons: &[String]) -> String {
    format!(
        "item {item_index} in category `{category_id}` dropped: {}",
        reasons.join(", ")
    )
}

/// Reads `id` as a non-blank string or an integer in decimal form.
fn raw_id(object: &Map<String, Value>) -> Result<String, String> {
    match object.get("id") {
        None | Some(Value::Null) => Err("missing `id`".to_string()),
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        Some(Value::String(_)) => Err("empty `id`".to_string()),
        Some(Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Ok(number.to_string())
        }
        Some(_) => Err("`id` must be a string or an integer".to_string()),
    }
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{sanitize_categories, sanitize_raw};
    use crate::model::shopping::{Category, Item};
    use serde_json::json;

    fn category(id: &str, name: &str, items: Vec<Item>) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            items,
        }
    }

    #[test]
    fn drops_invalid_item_and_empty_category() {
        let input = vec![
            category(
                "c1",
                "Valid",
                vec![Item::new("i1", "Good", 10.0, 1), Item::new("", "", -5.0, -1)],
            ),
            category("", "", vec![]),
        ];

        let report = sanitize_categories(&input);
        assert!(!report.is_valid);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.sanitized.len(), 1);
        assert_eq!(report.sanitized[0].id, "c1");
        assert_eq!(report.sanitized[0].items.len(), 1);
        assert_eq!(report.sanitized[0].items[0].id, "i1");
    }

    #[test]
    fn valid_input_has_no_warnings() {
        let input = vec![category("c1", "Dairy", vec![Item::new("i1", "Milk", 2.5, 2)])];
        let report = sanitize_categories(&input);
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
        assert_eq!(report.sanitized, input);
    }

    #[test]
    fn category_emptied_by_filtering_is_pruned_silently_after_item_warning() {
        let input = vec![category("c1", "Dairy", vec![Item::new("i1", "Milk", -1.0, 1)])];
        let report = sanitize_categories(&input);
        assert!(report.sanitized.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn rejects_non_finite_price_and_trims_names() {
        let input = vec![category(
            " c1 ",
            "  Dairy ",
            vec![
                Item::new("i1", "  Milk ", 2.5, 2),
                Item::new("i2", "Cream", f64::NAN, 1),
            ],
        )];
        let report = sanitize_categories(&input);
        assert_eq!(report.sanitized[0].id, "c1");
        assert_eq!(report.sanitized[0].name, "Dairy");
        assert_eq!(report.sanitized[0].items.len(), 1);
        assert_eq!(report.sanitized[0].items[0].name, "Milk");
    }

    #[test]
    fn zero_price_and_quantity_are_kept() {
        let input = vec![category("c1", "Free", vec![Item::new("i1", "Sample", 0.0, 0)])];
        let report = sanitize_categories(&input);
        assert!(report.is_valid);
        assert_eq!(report.sanitized.len(), 1);
    }

    #[test]
    fn raw_null_is_empty_and_valid() {
        let report = sanitize_raw(&serde_json::Value::Null);
        assert!(report.is_valid);
        assert!(report.sanitized.is_empty());
    }

    #[test]
    fn raw_non_array_is_rejected() {
        let report = sanitize_raw(&json!({"id": "c1"}));
        assert!(!report.is_valid);
        assert!(report.sanitized.is_empty());
    }

    #[test]
    fn raw_rejects_wrong_shapes_without_coercion() {
        let raw = json!([
            "not an object",
            {"id": "c0", "name": "No items"},
            {"id": "c1", "name": "Broken", "items": "milk"},
            {"id": "c2", "name": "Dairy", "items": [
                {"id": "i1", "name": "Milk", "price": 2.5, "quantity": 2},
                {"id": "i2", "name": "Cheese", "price": "4.0", "quantity": 1},
                {"id": "i3", "name": "Yogurt", "quantity": 1},
                {"id": "i4", "name": "Butter", "price": 3.0, "quantity": 1, "completed": true},
                42
            ]}
        ]);

        let report = sanitize_raw(&raw);
        assert!(!report.is_valid);
        assert_eq!(report.warnings.len(), 6);
        assert_eq!(report.sanitized.len(), 1);
        let items = &report.sanitized[0].items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "i1");
        assert!(items[1].completed);
    }

    #[test]
    fn raw_integer_ids_are_kept_as_strings() {
        let raw = json!([
            {"id": 1, "name": "Dairy", "items": [
                {"id": 1700000000000u64, "name": "Milk", "price": 2.5, "quantity": 2}
            ]},
            {"id": "c2", "name": "Bakery", "items": [
                {"id": 42, "name": "Bread", "price": 3.0, "quantity": 1},
                {"id": 4.5, "name": "Bagel", "price": 1.0, "quantity": 1},
                {"id": true, "name": "Roll", "price": 1.0, "quantity": 1},
                {"id": "i9", "name": "Scone", "price": 2.0, "quantity": 1.5}
            ]}
        ]);

        let report = sanitize_raw(&raw);
        assert_eq!(report.warnings.len(), 3);
        assert_eq!(report.sanitized.len(), 2);
        assert_eq!(report.sanitized[0].id, "1");
        assert_eq!(report.sanitized[0].items[0].id, "1700000000000");
        assert_eq!(report.sanitized[1].items.len(), 1);
        assert_eq!(report.sanitized[1].items[0].id, "42");
    }
}
