//! Entity document CRUD.
//!
//! Each entity is one row: fixed scalar columns plus two JSON documents
//! (`data` for open scalar fields, `collections` for the named ordered
//! collections). Decoding happens here, once; everything above works with
//! [`EntityDoc`] values. The store enforces no ordering invariants — those
//! live in [`super::collections`].

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeMap;

use crate::clock;
use crate::error::{CoreError, Result};
use crate::model::{CollectionName, EntityDoc, EntityKind, OrderedItem};

type CollectionsDoc = BTreeMap<CollectionName, Vec<OrderedItem>>;

/// Insert a new entity document.
///
/// # Errors
///
/// `AlreadyExists` when the id is taken; `TransactionAborted` on store
/// failure.
pub fn create_entity(conn: &mut Connection, doc: &EntityDoc) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let taken: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM entities WHERE entity_id = ?1)",
        params![doc.id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(CoreError::AlreadyExists { id: doc.id.clone() });
    }

    let now = clock::now_us();
    tx.execute(
        "INSERT INTO entities (entity_id, kind, name, data, collections, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            doc.id,
            doc.kind.as_str(),
            doc.name,
            encode_json(&doc.id, &doc.data)?,
            encode_json(&doc.id, &doc.collections)?,
            now,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

/// Fetch an entity document.
///
/// # Errors
///
/// `EntityNotFound` when the id is absent; `CorruptDocument` when a stored
/// column fails to decode.
pub fn get_entity(conn: &Connection, id: &str) -> Result<EntityDoc> {
    try_get_entity(conn, id)?.ok_or_else(|| CoreError::EntityNotFound { id: id.to_string() })
}

/// Fetch an entity document, `None` when absent.
///
/// # Errors
///
/// `CorruptDocument` when a stored column fails to decode.
pub fn try_get_entity(conn: &Connection, id: &str) -> Result<Option<EntityDoc>> {
    let row = conn
        .query_row(
            "SELECT kind, name, data, collections FROM entities WHERE entity_id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((kind_raw, name, data_raw, collections_raw)) = row else {
        return Ok(None);
    };

    let kind: EntityKind = kind_raw.parse().map_err(|_| CoreError::CorruptDocument {
        id: id.to_string(),
        reason: format!("unknown entity kind '{kind_raw}'"),
    })?;
    let data = decode_json(id, &data_raw)?;
    let collections: CollectionsDoc = decode_json(id, &collections_raw)?;

    Ok(Some(EntityDoc {
        id: id.to_string(),
        kind,
        name,
        data,
        collections,
    }))
}

/// List entity ids, optionally filtered by kind.
///
/// # Errors
///
/// `TransactionAborted` on store failure.
pub fn list_entity_ids(conn: &Connection, kind: Option<EntityKind>) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    match kind {
        Some(kind) => {
            let mut stmt = conn.prepare(
                "SELECT entity_id FROM entities WHERE kind = ?1 ORDER BY entity_id ASC",
            )?;
            let rows = stmt.query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?;
            for row in rows {
                ids.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare("SELECT entity_id FROM entities ORDER BY entity_id ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                ids.push(row?);
            }
        }
    }
    Ok(ids)
}

/// Rename an entity.
///
/// # Errors
///
/// `EntityNotFound` when the id is absent.
pub fn update_entity_name(conn: &Connection, id: &str, name: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE entities SET name = ?2, updated_at_us = ?3 WHERE entity_id = ?1",
        params![id, name, clock::now_us()],
    )?;
    if changed == 0 {
        return Err(CoreError::EntityNotFound { id: id.to_string() });
    }
    Ok(())
}

/// Shallow-merge `changes` into an entity's scalar data document.
///
/// # Errors
///
/// `EntityNotFound` when the id is absent; `CorruptDocument` when the
/// stored data fails to decode.
pub fn update_entity_data(
    conn: &mut Connection,
    id: &str,
    changes: &BTreeMap<String, serde_json::Value>,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut doc = match try_get_entity(&tx, id)? {
        Some(doc) => doc,
        None => return Err(CoreError::EntityNotFound { id: id.to_string() }),
    };
    for (key, value) in changes {
        doc.data.insert(key.clone(), value.clone());
    }
    tx.execute(
        "UPDATE entities SET data = ?2, updated_at_us = ?3 WHERE entity_id = ?1",
        params![id, encode_json(id, &doc.data)?, clock::now_us()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Delete an entity document.
///
/// Detaching ordered items or edges that reference the entity is a caller
/// responsibility — no cascade happens here.
///
/// # Errors
///
/// `EntityNotFound` when the id is absent.
pub fn delete_entity(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM entities WHERE entity_id = ?1", params![id])?;
    if changed == 0 {
        return Err(CoreError::EntityNotFound { id: id.to_string() });
    }
    Ok(())
}

/// Write an entity's collections document back. Used by the transfer
/// engine inside its own transaction; `conn` may be a live transaction.
pub(crate) fn write_collections(conn: &Connection, doc: &EntityDoc) -> Result<()> {
    let changed = conn.execute(
        "UPDATE entities SET collections = ?2, updated_at_us = ?3 WHERE entity_id = ?1",
        params![doc.id, encode_json(&doc.id, &doc.collections)?, clock::now_us()],
    )?;
    if changed == 0 {
        return Err(CoreError::EntityNotFound {
            id: doc.id.clone(),
        });
    }
    Ok(())
}

fn encode_json<T: serde::Serialize>(id: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CoreError::CorruptDocument {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(id: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| CoreError::CorruptDocument {
        id: id.to_string(),
        reason: e.to_string(),
    })
}
