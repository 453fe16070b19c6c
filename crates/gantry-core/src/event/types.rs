//! Event type catalog.
//!
//! Wire strings use the `<verb><Subject>Success` camelCase convention of the
//! event log; only success events are recorded (a failed command never
//! reaches the log).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven event types in the gantry event catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A node was added to a graph.
    CreateNode,
    /// A node's payload was partially updated.
    UpdateNode,
    /// A node was removed from a graph.
    DeleteNode,
    /// An edge was added to a graph.
    CreateEdge,
    /// An edge was removed from a graph.
    DeleteEdge,
    /// A graph's own scalar data changed.
    UpdateGraph,
    /// A graph was deleted.
    DeleteGraph,
}

impl EventType {
    /// All known event types in catalog order.
    pub const ALL: [Self; 7] = [
        Self::CreateNode,
        Self::UpdateNode,
        Self::DeleteNode,
        Self::CreateEdge,
        Self::DeleteEdge,
        Self::UpdateGraph,
        Self::DeleteGraph,
    ];

    /// Return the canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateNode => "createNodeSuccess",
            Self::UpdateNode => "updateNodeSuccess",
            Self::DeleteNode => "deleteNodeSuccess",
            Self::CreateEdge => "createEdgeSuccess",
            Self::DeleteEdge => "deleteEdgeSuccess",
            Self::UpdateGraph => "updateGraphSuccess",
            Self::DeleteGraph => "deleteGraphSuccess",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': expected one of createNodeSuccess, \
             updateNodeSuccess, deleteNodeSuccess, createEdgeSuccess, \
             deleteEdgeSuccess, updateGraphSuccess, deleteGraphSuccess",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createNodeSuccess" => Ok(Self::CreateNode),
            "updateNodeSuccess" => Ok(Self::UpdateNode),
            "deleteNodeSuccess" => Ok(Self::DeleteNode),
            "createEdgeSuccess" => Ok(Self::CreateEdge),
            "deleteEdgeSuccess" => Ok(Self::DeleteEdge),
            "updateGraphSuccess" => Ok(Self::UpdateGraph),
            "deleteGraphSuccess" => Ok(Self::DeleteGraph),
            _ => Err(UnknownEventType { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the wire string.
impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
