//! Event data model for the append-only domain event log.
//!
//! Events are immutable once appended. Each carries a typed payload, the
//! list of entity/graph ids it is relevant to (`reference_ids`, the fan-out
//! filter), and a wall-clock timestamp in microseconds — the sole ordering
//! key of the log. The event id is a BLAKE3 content hash over the other
//! fields, rendered `blake3:<hex>`; it identifies a position in the log but
//! carries no ordering of its own.

pub mod payload;
pub mod types;

pub use payload::{
    CreateEdgeData, CreateNodeData, DeleteEdgeData, DeleteGraphData, DeleteNodeData, EventData,
    PayloadParseError, UpdateGraphData, UpdateNodeData,
};
pub use types::{EventType, UnknownEventType};

use serde::{Deserialize, Serialize};

/// A single event in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Content hash id, `blake3:<hex>`. Opaque position marker.
    pub id: String,

    /// The type of mutation this event records.
    pub event_type: EventType,

    /// Typed payload specific to the event type.
    pub payload: EventData,

    /// Every entity/graph id this event is relevant to.
    pub reference_ids: Vec<String>,

    /// Wall-clock microseconds since the Unix epoch. Events are ordered by
    /// this field ascending.
    pub created_at_us: i64,
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Two-pass: event_type drives the typed decode of the payload.
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            event_type: EventType,
            payload: serde_json::Value,
            reference_ids: Vec<String>,
            created_at_us: i64,
        }

        let raw = Raw::deserialize(deserializer)?;
        let payload = EventData::deserialize_for(raw.event_type, raw.payload)
            .map_err(serde::de::Error::custom)?;

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            payload,
            reference_ids: raw.reference_ids,
            created_at_us: raw.created_at_us,
        })
    }
}

/// An event that has not been sealed with its content id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub payload: EventData,
    pub reference_ids: Vec<String>,
    pub created_at_us: i64,
}

impl EventDraft {
    /// Build a draft for the given payload, stamping it with `created_at_us`
    /// and referencing the payload's graph.
    #[must_use]
    pub fn new(payload: EventData, created_at_us: i64) -> Self {
        let reference_ids = vec![payload.graph_id().to_string()];
        Self {
            payload,
            reference_ids,
            created_at_us,
        }
    }

    /// Add another reference id (e.g. the owning entity of the graph).
    #[must_use]
    pub fn with_reference(mut self, ref_id: impl Into<String>) -> Self {
        self.reference_ids.push(ref_id.into());
        self
    }

    /// Seal the draft into an [`Event`] by computing its content id.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload fails to serialize.
    pub fn seal(self) -> Result<Event, serde_json::Error> {
        let id = compute_event_id(&self.payload, &self.reference_ids, self.created_at_us)?;
        Ok(Event {
            id,
            event_type: self.payload.event_type(),
            payload: self.payload,
            reference_ids: self.reference_ids,
            created_at_us: self.created_at_us,
        })
    }
}

/// Compute the BLAKE3 content id for an event.
///
/// Hash input is `{created_at_us}\t{type}\t{refs,comma-joined}\t{payload}`
/// where the payload is serialized through [`EventData::to_json_value`]
/// (key-sorted, so the same logical payload always hashes identically).
///
/// # Errors
///
/// Returns an error if the payload fails to serialize.
pub fn compute_event_id(
    payload: &EventData,
    reference_ids: &[String],
    created_at_us: i64,
) -> Result<String, serde_json::Error> {
    let payload_json = serde_json::to_string(&payload.to_json_value()?)?;
    let refs = reference_ids.join(",");
    let input = format!(
        "{created_at_us}\t{}\t{refs}\t{payload_json}",
        payload.event_type()
    );
    let hash = blake3::hash(input.as_bytes());
    Ok(format!("blake3:{hash}"))
}
