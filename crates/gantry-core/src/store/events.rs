//! Append-only event log.
//!
//! Events are written once and never updated or deleted; writers only
//! append, so log writes never conflict with each other. Reads are driven
//! by the watermark query: "the nearest event referencing this graph,
//! strictly after the event my watermark names". Ordering is by
//! `created_at_us` ascending with the SQLite rowid as a stable tiebreaker —
//! rowid is append order within one store, so same-microsecond events still
//! have a well-defined position.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::error::{CoreError, Result};
use crate::event::{Event, EventData, EventDraft, EventType};

/// Append a sealed draft to the log, recording its reference ids for
/// fan-out filtering.
///
/// # Errors
///
/// `AlreadyExists` when an event with the same content id is already in the
/// log; `CorruptDocument` when the payload fails to serialize.
pub fn append_event(conn: &mut Connection, draft: EventDraft) -> Result<Event> {
    let event = draft.seal().map_err(|e| CoreError::CorruptDocument {
        id: "<draft>".to_string(),
        reason: e.to_string(),
    })?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    insert_event(&tx, &event)?;
    tx.commit()?;
    Ok(event)
}

/// Insert an already-sealed event. `conn` may be a live transaction, so a
/// command can persist its mutation and its event atomically.
pub(crate) fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let payload = event
        .payload
        .to_json_value()
        .map_err(|e| CoreError::CorruptDocument {
            id: event.id.clone(),
            reason: e.to_string(),
        })?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO events (event_id, event_type, payload, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            event.id,
            event.event_type.as_str(),
            payload.to_string(),
            event.created_at_us,
        ],
    )?;
    if inserted == 0 {
        return Err(CoreError::AlreadyExists {
            id: event.id.clone(),
        });
    }

    for ref_id in &event.reference_ids {
        conn.execute(
            "INSERT OR IGNORE INTO event_refs (event_id, ref_id) VALUES (?1, ?2)",
            params![event.id, ref_id],
        )?;
    }
    Ok(())
}

/// Fetch one event by id.
///
/// # Errors
///
/// `EventNotFound` when the id is absent; `CorruptDocument` when the stored
/// payload fails to decode.
pub fn get_event(conn: &Connection, id: &str) -> Result<Event> {
    let row = conn
        .query_row(
            "SELECT event_type, payload, created_at_us FROM events WHERE event_id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((type_raw, payload_raw, created_at_us)) = row else {
        return Err(CoreError::EventNotFound { id: id.to_string() });
    };
    decode_event(conn, id, &type_raw, &payload_raw, created_at_us)
}

/// Locate the nearest event referencing `ref_id`, with a type in `filter`,
/// strictly after the event named by `watermark`. `None` watermark means
/// "from the beginning of the log"; an empty `filter` matches every type.
///
/// Returns at most one event — the single-hop catch-up step.
///
/// # Errors
///
/// `WatermarkInvalid` when the watermark names an event the log cannot
/// read (the caller must fall back to a full reload); `CorruptDocument` on
/// payload decode failure.
pub fn next_event_after(
    conn: &Connection,
    ref_id: &str,
    watermark: Option<&str>,
    filter: &[EventType],
) -> Result<Option<Event>> {
    // Resolve the watermark to its position in the log. The log is
    // append-only, so a missing watermark event means the caller's state
    // is unusable for incremental catch-up.
    let (wm_ts, wm_rowid) = match watermark {
        None => (i64::MIN, i64::MIN),
        Some(id) => conn
            .query_row(
                "SELECT created_at_us, rowid FROM events WHERE event_id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?
            .ok_or_else(|| CoreError::WatermarkInvalid { id: id.to_string() })?,
    };

    let type_clause = if filter.is_empty() {
        String::new()
    } else {
        let placeholders = vec!["?"; filter.len()].join(", ");
        format!("AND e.event_type IN ({placeholders})")
    };
    let sql = format!(
        "SELECT e.event_id, e.event_type, e.payload, e.created_at_us
         FROM events e
         JOIN event_refs r ON r.event_id = e.event_id
         WHERE r.ref_id = ?1
           AND (e.created_at_us > ?2 OR (e.created_at_us = ?2 AND e.rowid > ?3))
           {type_clause}
         ORDER BY e.created_at_us ASC, e.rowid ASC
         LIMIT 1"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(ref_id.to_string()),
        Box::new(wm_ts),
        Box::new(wm_rowid),
    ];
    for event_type in filter {
        param_values.push(Box::new(event_type.as_str()));
    }
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let row = stmt
        .query_row(rusqlite::params_from_iter(params_ref), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .optional()?;

    match row {
        None => Ok(None),
        Some((id, type_raw, payload_raw, created_at_us)) => {
            decode_event(conn, &id, &type_raw, &payload_raw, created_at_us).map(Some)
        }
    }
}

/// The most recent events referencing `ref_id`, newest first.
///
/// # Errors
///
/// `CorruptDocument` on payload decode failure.
pub fn recent_events(conn: &Connection, ref_id: &str, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT e.event_id, e.event_type, e.payload, e.created_at_us
         FROM events e
         JOIN event_refs r ON r.event_id = e.event_id
         WHERE r.ref_id = ?1
         ORDER BY e.created_at_us DESC, e.rowid DESC
         LIMIT ?2",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![ref_id, limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (id, type_raw, payload_raw, created_at_us) = row?;
        events.push(decode_event(conn, &id, &type_raw, &payload_raw, created_at_us)?);
    }
    Ok(events)
}

fn decode_event(
    conn: &Connection,
    id: &str,
    type_raw: &str,
    payload_raw: &str,
    created_at_us: i64,
) -> Result<Event> {
    let corrupt = |reason: String| CoreError::CorruptDocument {
        id: id.to_string(),
        reason,
    };

    let event_type: EventType = type_raw
        .parse()
        .map_err(|e: crate::event::UnknownEventType| corrupt(e.to_string()))?;
    let payload_value: serde_json::Value =
        serde_json::from_str(payload_raw).map_err(|e| corrupt(e.to_string()))?;
    let payload = EventData::deserialize_for(event_type, payload_value)
        .map_err(|e| corrupt(e.to_string()))?;

    let mut stmt =
        conn.prepare("SELECT ref_id FROM event_refs WHERE event_id = ?1 ORDER BY rowid ASC")?;
    let refs = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    let mut reference_ids = Vec::new();
    for r in refs {
        reference_ids.push(r?);
    }

    Ok(Event {
        id: id.to_string(),
        event_type,
        payload,
        reference_ids,
        created_at_us,
    })
}
