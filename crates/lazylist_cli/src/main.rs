//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lazylist_core` linkage and run one sync round trip against the
//!   in-memory persister.
//! - Keep output deterministic apart from generated category ids.

use lazylist_core::{
    check_consistency, CategoryTarget, Container, Item, MemoryPersister, SyncConfig, SyncEngine,
    SyncError,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("lazylist_core ping={}", lazylist_core::ping());
    println!("lazylist_core version={}", lazylist_core::core_version());

    if let Err(err) = round_trip().await {
        eprintln!("lazylist_core sync=error {err}");
        std::process::exit(1);
    }
}

async fn round_trip() -> Result<(), SyncError> {
    let persister = Arc::new(MemoryPersister::new());
    let engine = SyncEngine::new(persister.clone(), SyncConfig::default());
    let mut collection = vec![Container::new("smoke", "Smoke list")];

    let snapshot = collection.clone();
    let added = engine
        .add_or_update_item(
            "smoke",
            CategoryTarget::name("Dairy"),
            Item::new("milk", "Milk", 2.5, 2),
            &snapshot,
            &mut collection,
            None,
        )
        .await?;
    let category_id = added.shopping_list[0].id.clone();

    let snapshot = collection.clone();
    engine
        .toggle_item_completion("smoke", &category_id, "milk", &snapshot, &mut collection, None)
        .await?;

    if let Some(document) = persister.document("smoke") {
        match serde_json::to_string_pretty(&document) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("lazylist_core document=unprintable {err}"),
        }
    }

    let consistency = check_consistency(&collection);
    println!(
        "lazylist_core consistency with_list={} invalid={}",
        consistency.containers_with_shopping_list, consistency.containers_with_invalid_data
    );

    let snapshot = collection.clone();
    engine
        .delete_item("smoke", &category_id, "milk", &snapshot, &mut collection, None)
        .await?;
    println!(
        "lazylist_core sync=ok categories={} log_entries={}",
        collection[0].shopping_list.len(),
        engine.sync_log().len()
    );
    Ok(())
}
