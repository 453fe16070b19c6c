//! Ordered collection transfer engine.
//!
//! Two operations, both atomic with respect to the entity documents they
//! touch: [`reorder`] rewrites one owner's collection to a permutation of
//! itself, and [`transfer`] moves one item between two owners' same-named
//! collections. Every precondition is checked against the transaction's own
//! read, never a cached one — so a caller racing a concurrent writer fails
//! with a typed error instead of corrupting the collection. On any failure
//! the transaction rolls back whole; nothing partial is ever observable.

use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashSet;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::model::{CollectionName, EntityDoc, OrderedItem};

use super::entities;

/// Rewrite `owner_id`'s named collection into a new permutation of itself.
///
/// The new order is validated and the collection rebuilt from the items the
/// transaction itself read: `new_order` supplies only the id sequence, each
/// item's payload comes from the current stored state. This makes the
/// operation robust to the collection having been mutated between the UI
/// computing the order and the transaction committing.
///
/// # Errors
///
/// `EntityNotFound` when the owner is absent; `InvalidPermutation` when
/// `new_order` names an unknown id, omits a present id, or duplicates an
/// id; `TransactionAborted` on store conflict.
pub fn reorder(
    conn: &mut Connection,
    owner_id: &str,
    collection: CollectionName,
    new_order: &[String],
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut owner = entities::get_entity(&tx, owner_id)?;
    let reordered = permuted(&owner, collection, new_order)?;
    owner.set_collection(collection, reordered);
    entities::write_collections(&tx, &owner)?;

    tx.commit()?;
    debug!(owner_id, %collection, len = new_order.len(), "collection reordered");
    Ok(())
}

/// Move `item_id` from `from_id`'s collection into `to_id`'s same-named
/// collection at `index` (clamped to the destination length). Both owners
/// are read and written inside one transaction, so a concurrent transfer of
/// the same item serializes: the loser's own read finds the source already
/// vacated and fails `ItemNotFound` rather than inserting a duplicate.
///
/// `from_id == to_id` moves the item within a single owner document.
///
/// Returns the index the item actually landed at.
///
/// # Errors
///
/// `EntityNotFound` when either owner is absent; `ItemNotFound` when the
/// source does not hold the item; `AlreadyExists` when the destination
/// already holds an item with the same id; `TransactionAborted` on store
/// conflict.
pub fn transfer(
    conn: &mut Connection,
    from_id: &str,
    to_id: &str,
    collection: CollectionName,
    item_id: &str,
    index: usize,
) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let landed = if from_id == to_id {
        let mut owner = entities::get_entity(&tx, from_id)?;
        let landed = move_within(&mut owner, collection, item_id, index)?;
        entities::write_collections(&tx, &owner)?;
        landed
    } else {
        let mut from = entities::get_entity(&tx, from_id)?;
        let mut to = entities::get_entity(&tx, to_id)?;
        let landed = move_across(&mut from, &mut to, collection, item_id, index)?;
        entities::write_collections(&tx, &from)?;
        entities::write_collections(&tx, &to)?;
        landed
    };

    tx.commit()?;
    debug!(from_id, to_id, %collection, item_id, landed, "item transferred");
    Ok(landed)
}

/// Validate `new_order` against the owner's current collection and return
/// the items rebuilt in that order.
fn permuted(
    owner: &EntityDoc,
    collection: CollectionName,
    new_order: &[String],
) -> Result<Vec<OrderedItem>> {
    let current = owner.collection(collection);
    let current_ids: HashSet<&str> = current.iter().map(|i| i.id.as_str()).collect();

    let invalid = |reason: String| CoreError::InvalidPermutation {
        owner_id: owner.id.clone(),
        collection,
        reason,
    };

    let mut seen = HashSet::new();
    for id in new_order {
        if !current_ids.contains(id.as_str()) {
            return Err(invalid(format!("unknown item id '{id}'")));
        }
        if !seen.insert(id.as_str()) {
            return Err(invalid(format!("duplicate item id '{id}'")));
        }
    }
    if new_order.len() != current.len() {
        return Err(invalid(format!(
            "length mismatch: collection has {} items, new order has {}",
            current.len(),
            new_order.len()
        )));
    }

    // Re-fetch each item by id from the state this transaction read.
    let rebuilt = new_order
        .iter()
        .filter_map(|id| current.iter().find(|item| item.id == *id).cloned())
        .collect();
    Ok(rebuilt)
}

fn take_item(
    owner: &EntityDoc,
    collection: CollectionName,
    item_id: &str,
) -> Result<(OrderedItem, Vec<OrderedItem>)> {
    let mut items = owner.collection(collection).to_vec();
    let pos = items
        .iter()
        .position(|i| i.id == item_id)
        .ok_or_else(|| CoreError::ItemNotFound {
            owner_id: owner.id.clone(),
            collection,
            item_id: item_id.to_string(),
        })?;
    let item = items.remove(pos);
    Ok((item, items))
}

fn move_within(
    owner: &mut EntityDoc,
    collection: CollectionName,
    item_id: &str,
    index: usize,
) -> Result<usize> {
    let (item, mut items) = take_item(owner, collection, item_id)?;
    let landed = index.min(items.len());
    items.insert(landed, item);
    owner.set_collection(collection, items);
    Ok(landed)
}

fn move_across(
    from: &mut EntityDoc,
    to: &mut EntityDoc,
    collection: CollectionName,
    item_id: &str,
    index: usize,
) -> Result<usize> {
    let (item, remaining) = take_item(from, collection, item_id)?;
    from.set_collection(collection, remaining);

    let mut dest = to.collection(collection).to_vec();
    if dest.iter().any(|i| i.id == item_id) {
        // One owner at a time: a duplicate in the destination would leave
        // the item listed twice after the source write-back.
        return Err(CoreError::AlreadyExists {
            id: item_id.to_string(),
        });
    }
    let landed = index.min(dest.len());
    dest.insert(landed, item);
    to.set_collection(collection, dest);
    Ok(landed)
}
