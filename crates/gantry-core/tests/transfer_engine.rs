//! Integration tests: the ordered-collection transfer engine against a real
//! store file, including the cross-connection race the engine exists to
//! serialize.

use gantry_core::CoreError;
use gantry_core::model::{CollectionName, EntityDoc, EntityKind, OrderedItem};
use gantry_core::store::{collections, entities, open_store};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Barrier};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn store_on_disk() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("gantry.sqlite3");
    (dir, path)
}

fn instruction(id: &str, tasks: &[&str]) -> EntityDoc {
    let mut doc = EntityDoc::new(id, EntityKind::Instruction, format!("instruction {id}"));
    doc.set_collection(
        CollectionName::Tasks,
        tasks
            .iter()
            .map(|t| OrderedItem::new(*t).with_attr("name", json!(format!("task {t}"))))
            .collect(),
    );
    doc
}

fn task_ids(conn: &Connection, owner: &str) -> Vec<String> {
    entities::get_entity(conn, owner)
        .expect("get entity")
        .collection_ids(CollectionName::Tasks)
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn order(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| (*s).to_string()).collect()
}

// ---------------------------------------------------------------------------
// The two concrete scenarios from the product contract
// ---------------------------------------------------------------------------

#[test]
fn reorder_scenario_abc_to_cab() {
    let (_dir, path) = store_on_disk();
    let mut conn = open_store(&path).expect("open store");
    entities::create_entity(&mut conn, &instruction("I1", &["A", "B", "C"])).expect("create");

    collections::reorder(&mut conn, "I1", CollectionName::Tasks, &order(&["C", "A", "B"]))
        .expect("reorder");
    assert_eq!(task_ids(&conn, "I1"), vec!["C", "A", "B"]);
}

#[test]
fn transfer_scenario_b_to_second_owner() {
    let (_dir, path) = store_on_disk();
    let mut conn = open_store(&path).expect("open store");
    entities::create_entity(&mut conn, &instruction("I1", &["C", "A", "B"])).expect("create");
    entities::create_entity(&mut conn, &instruction("I2", &["X"])).expect("create");

    collections::transfer(&mut conn, "I1", "I2", CollectionName::Tasks, "B", 1)
        .expect("transfer");
    assert_eq!(task_ids(&conn, "I1"), vec!["C", "A"]);
    assert_eq!(task_ids(&conn, "I2"), vec!["X", "B"]);
}

// ---------------------------------------------------------------------------
// Exactly-once and abort-whole semantics
// ---------------------------------------------------------------------------

#[test]
fn transfer_preserves_the_combined_multiset() {
    let (_dir, path) = store_on_disk();
    let mut conn = open_store(&path).expect("open store");
    entities::create_entity(&mut conn, &instruction("I1", &["a", "b", "c"])).expect("create");
    entities::create_entity(&mut conn, &instruction("I2", &["x", "y"])).expect("create");

    collections::transfer(&mut conn, "I1", "I2", CollectionName::Tasks, "b", 0)
        .expect("transfer");

    let mut combined = task_ids(&conn, "I1");
    combined.extend(task_ids(&conn, "I2"));
    combined.sort();
    assert_eq!(combined, vec!["a", "b", "c", "x", "y"]);
    // And the item lives in exactly one owner.
    assert!(!task_ids(&conn, "I1").contains(&"b".to_string()));
    assert_eq!(task_ids(&conn, "I2")[0], "b");
}

#[test]
fn failed_transfer_leaves_both_owners_untouched() {
    let (_dir, path) = store_on_disk();
    let mut conn = open_store(&path).expect("open store");
    entities::create_entity(&mut conn, &instruction("I1", &["a"])).expect("create");
    entities::create_entity(&mut conn, &instruction("I2", &["x"])).expect("create");

    let err = collections::transfer(&mut conn, "I1", "I2", CollectionName::Tasks, "ghost", 0)
        .unwrap_err();
    assert!(matches!(err, CoreError::ItemNotFound { .. }));

    assert_eq!(task_ids(&conn, "I1"), vec!["a"]);
    assert_eq!(task_ids(&conn, "I2"), vec!["x"]);
}

#[test]
fn reorder_against_concurrently_changed_collection_fails_clean() {
    let (_dir, path) = store_on_disk();
    let mut conn_a = open_store(&path).expect("open a");
    let mut conn_b = open_store(&path).expect("open b");
    entities::create_entity(&mut conn_a, &instruction("I1", &["a", "b", "c"])).expect("create");
    entities::create_entity(&mut conn_a, &instruction("I2", &[])).expect("create");

    // Client B computed its order against [a, b, c]...
    let stale_order = order(&["c", "b", "a"]);
    // ...but client A moves "b" away before B's reorder lands.
    collections::transfer(&mut conn_a, "I1", "I2", CollectionName::Tasks, "b", 0)
        .expect("transfer");

    // B's transaction reads the current collection, not B's cached copy,
    // so the stale order is detected instead of resurrecting "b".
    let err = collections::reorder(&mut conn_b, "I1", CollectionName::Tasks, &stale_order)
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidPermutation { .. }));
    assert_eq!(task_ids(&conn_a, "I1"), vec!["a", "c"]);
}

// ---------------------------------------------------------------------------
// Concurrent transfer safety
// ---------------------------------------------------------------------------

#[test]
fn second_transfer_of_same_item_observes_the_first() {
    let (_dir, path) = store_on_disk();
    let mut conn_a = open_store(&path).expect("open a");
    let mut conn_b = open_store(&path).expect("open b");
    entities::create_entity(&mut conn_a, &instruction("I1", &["m"])).expect("create");
    entities::create_entity(&mut conn_a, &instruction("I2", &[])).expect("create");
    entities::create_entity(&mut conn_a, &instruction("I3", &[])).expect("create");

    collections::transfer(&mut conn_a, "I1", "I2", CollectionName::Tasks, "m", 0)
        .expect("first transfer");

    let err = collections::transfer(&mut conn_b, "I1", "I3", CollectionName::Tasks, "m", 0)
        .unwrap_err();
    assert!(matches!(err, CoreError::ItemNotFound { .. }));

    // Exactly one owner holds the item.
    assert_eq!(task_ids(&conn_b, "I2"), vec!["m"]);
    assert!(task_ids(&conn_b, "I1").is_empty());
    assert!(task_ids(&conn_b, "I3").is_empty());
}

#[test]
fn racing_transfers_of_same_item_move_it_exactly_once() {
    let (_dir, path) = store_on_disk();
    let mut conn = open_store(&path).expect("open store");
    entities::create_entity(&mut conn, &instruction("I1", &["m"])).expect("create");
    entities::create_entity(&mut conn, &instruction("I2", &[])).expect("create");
    entities::create_entity(&mut conn, &instruction("I3", &[])).expect("create");
    drop(conn);

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for dest in ["I2", "I3"] {
        let barrier = Arc::clone(&barrier);
        let path = path.clone();
        handles.push(std::thread::spawn(move || {
            let mut conn = open_store(&path).expect("open store");
            barrier.wait();
            collections::transfer(&mut conn, "I1", dest, CollectionName::Tasks, "m", 0)
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok_count, 1, "exactly one racer must win: {results:?}");
    let loser = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one racer must lose");
    assert!(matches!(loser, CoreError::ItemNotFound { .. }), "{loser:?}");

    // The item ended up in exactly one destination, and is gone from I1.
    let conn = open_store(&path).expect("open store");
    let holders: Vec<_> = ["I1", "I2", "I3"]
        .iter()
        .filter(|owner| task_ids(&conn, owner).contains(&"m".to_string()))
        .collect();
    assert_eq!(holders.len(), 1);
    assert!(task_ids(&conn, "I1").is_empty());
}

#[test]
fn transfers_of_different_items_on_same_owner_both_succeed() {
    let (_dir, path) = store_on_disk();
    let mut conn_a = open_store(&path).expect("open a");
    let mut conn_b = open_store(&path).expect("open b");
    entities::create_entity(&mut conn_a, &instruction("I1", &["p", "q"])).expect("create");
    entities::create_entity(&mut conn_a, &instruction("I2", &[])).expect("create");
    entities::create_entity(&mut conn_a, &instruction("I3", &[])).expect("create");

    collections::transfer(&mut conn_a, "I1", "I2", CollectionName::Tasks, "p", 0)
        .expect("transfer p");
    collections::transfer(&mut conn_b, "I1", "I3", CollectionName::Tasks, "q", 0)
        .expect("transfer q");

    assert!(task_ids(&conn_a, "I1").is_empty());
    assert_eq!(task_ids(&conn_a, "I2"), vec!["p"]);
    assert_eq!(task_ids(&conn_a, "I3"), vec!["q"]);
}
