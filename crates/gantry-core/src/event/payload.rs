//! Typed payload structs for each event type.
//!
//! The type discriminant lives outside the payload (in the event envelope),
//! so deserialization goes through [`EventData::deserialize_for`] with the
//! known [`EventType`]. Node payloads additionally carry a `kind` tag that
//! drives the typed decode of their `data` and the per-kind dispatch in the
//! reconciliation cache. Unknown fields are preserved via `#[serde(flatten)]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{NodeData, NodeKind};

use super::types::EventType;

/// Error produced when an event payload cannot be decoded.
#[derive(Debug, thiserror::Error)]
#[error("invalid payload for {event_type}: {source}")]
pub struct PayloadParseError {
    pub event_type: EventType,
    #[source]
    pub source: serde_json::Error,
}

/// Payload for `createNodeSuccess`: the full typed node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateNodeData {
    pub graph_id: String,
    pub node_id: String,
    pub kind: NodeKind,
    pub data: NodeData,
}

impl<'de> Deserialize<'de> for CreateNodeData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Two-pass: the kind field drives the typed decode of data.
        #[derive(Deserialize)]
        struct Raw {
            graph_id: String,
            node_id: String,
            kind: NodeKind,
            data: serde_json::Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        let data =
            NodeData::deserialize_for(raw.kind, raw.data).map_err(serde::de::Error::custom)?;
        Ok(Self {
            graph_id: raw.graph_id,
            node_id: raw.node_id,
            kind: raw.kind,
            data,
        })
    }
}

/// Payload for `updateNodeSuccess`: a shallow change set, not a full node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeData {
    pub graph_id: String,
    pub node_id: String,
    pub kind: NodeKind,
    pub changes: BTreeMap<String, serde_json::Value>,
}

/// Payload for `deleteNodeSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteNodeData {
    pub graph_id: String,
    pub node_id: String,
    pub kind: NodeKind,
}

/// Payload for `createEdgeSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEdgeData {
    pub graph_id: String,
    pub edge_id: String,
    pub source: String,
    pub target: String,
}

/// Payload for `deleteEdgeSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteEdgeData {
    pub graph_id: String,
    pub edge_id: String,
}

/// Payload for `updateGraphSuccess`: shallow changes to the graph's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateGraphData {
    pub graph_id: String,
    pub changes: BTreeMap<String, serde_json::Value>,
}

/// Payload for `deleteGraphSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteGraphData {
    pub graph_id: String,
}

/// Typed payload for an event. The discriminant comes from [`EventType`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    CreateNode(CreateNodeData),
    UpdateNode(UpdateNodeData),
    DeleteNode(DeleteNodeData),
    CreateEdge(CreateEdgeData),
    DeleteEdge(DeleteEdgeData),
    UpdateGraph(UpdateGraphData),
    DeleteGraph(DeleteGraphData),
}

impl EventData {
    /// The event type this payload belongs to.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::CreateNode(_) => EventType::CreateNode,
            Self::UpdateNode(_) => EventType::UpdateNode,
            Self::DeleteNode(_) => EventType::DeleteNode,
            Self::CreateEdge(_) => EventType::CreateEdge,
            Self::DeleteEdge(_) => EventType::DeleteEdge,
            Self::UpdateGraph(_) => EventType::UpdateGraph,
            Self::DeleteGraph(_) => EventType::DeleteGraph,
        }
    }

    /// The graph the payload addresses.
    #[must_use]
    pub fn graph_id(&self) -> &str {
        match self {
            Self::CreateNode(d) => &d.graph_id,
            Self::UpdateNode(d) => &d.graph_id,
            Self::DeleteNode(d) => &d.graph_id,
            Self::CreateEdge(d) => &d.graph_id,
            Self::DeleteEdge(d) => &d.graph_id,
            Self::UpdateGraph(d) => &d.graph_id,
            Self::DeleteGraph(d) => &d.graph_id,
        }
    }

    /// Deserialize a JSON value into the correct variant for a known type.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadParseError`] if the JSON does not match the expected
    /// schema for the given event type.
    pub fn deserialize_for(
        event_type: EventType,
        value: serde_json::Value,
    ) -> Result<Self, PayloadParseError> {
        let result = match event_type {
            EventType::CreateNode => serde_json::from_value(value).map(Self::CreateNode),
            EventType::UpdateNode => serde_json::from_value(value).map(Self::UpdateNode),
            EventType::DeleteNode => serde_json::from_value(value).map(Self::DeleteNode),
            EventType::CreateEdge => serde_json::from_value(value).map(Self::CreateEdge),
            EventType::DeleteEdge => serde_json::from_value(value).map(Self::DeleteEdge),
            EventType::UpdateGraph => serde_json::from_value(value).map(Self::UpdateGraph),
            EventType::DeleteGraph => serde_json::from_value(value).map(Self::DeleteGraph),
        };
        result.map_err(|source| PayloadParseError { event_type, source })
    }

    /// Serialize the payload to a [`serde_json::Value`].
    ///
    /// Going through `Value` also canonicalizes: `serde_json` maps are
    /// key-sorted, so re-serializing the value yields deterministic bytes
    /// for hashing.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner struct fails to serialize.
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::CreateNode(d) => serde_json::to_value(d),
            Self::UpdateNode(d) => serde_json::to_value(d),
            Self::DeleteNode(d) => serde_json::to_value(d),
            Self::CreateEdge(d) => serde_json::to_value(d),
            Self::DeleteEdge(d) => serde_json::to_value(d),
            Self::UpdateGraph(d) => serde_json::to_value(d),
            Self::DeleteGraph(d) => serde_json::to_value(d),
        }
    }
}

impl Serialize for EventData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::CreateNode(d) => d.serialize(serializer),
            Self::UpdateNode(d) => d.serialize(serializer),
            Self::DeleteNode(d) => d.serialize(serializer),
            Self::CreateEdge(d) => d.serialize(serializer),
            Self::DeleteEdge(d) => d.serialize(serializer),
            Self::UpdateGraph(d) => d.serialize(serializer),
            Self::DeleteGraph(d) => d.serialize(serializer),
        }
    }
}
