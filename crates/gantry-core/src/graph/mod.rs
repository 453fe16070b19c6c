//! Typed, kind-discriminated graph model.
//!
//! A [`Graph`] is a set of [`Node`]s and directed [`Edge`]s plus the graph's
//! own scalar data and its event-log watermark (`last_event_id`). Mutations
//! that assert a node kind fail with `KindMismatch` when the stored kind
//! disagrees — the guard against applying a stale or wrong-typed event.
//!
//! Connection validity lives in [`connect`]; it is pure and evaluated before
//! any edge creation is attempted.

pub mod connect;

pub use connect::can_connect;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::model::{NodeData, NodeKind};

/// The graph kinds, one per owning domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Workspace,
    Program,
    Application,
    Instruction,
}

impl GraphKind {
    pub const ALL: [Self; 4] = [
        Self::Workspace,
        Self::Program,
        Self::Application,
        Self::Instruction,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Program => "program",
            Self::Application => "application",
            Self::Instruction => "instruction",
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown graph kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown graph kind '{raw}'")]
pub struct UnknownGraphKind {
    pub raw: String,
}

impl FromStr for GraphKind {
    type Err = UnknownGraphKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "workspace" => Ok(Self::Workspace),
            "program" => Ok(Self::Program),
            "application" => Ok(Self::Application),
            "instruction" => Ok(Self::Instruction),
            _ => Err(UnknownGraphKind { raw: s.to_string() }),
        }
    }
}

/// A polymorphic graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub data: NodeData,
}

impl Node {
    /// Build a node from its typed payload; the kind comes from the payload.
    #[must_use]
    pub fn new(id: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind: data.kind(),
            data,
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            kind: NodeKind,
            data: serde_json::Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        let data =
            NodeData::deserialize_for(raw.kind, raw.data).map_err(serde::de::Error::custom)?;
        Ok(Self {
            id: raw.id,
            kind: raw.kind,
            data,
        })
    }
}

/// A directed, unweighted edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// A typed graph with its event-log watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub id: String,
    pub kind: GraphKind,

    /// The graph's own scalar data (name, owner entity id, ...).
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Id of the last event this graph projection has incorporated.
    /// `None` for a graph that has never caught up.
    #[serde(default)]
    pub last_event_id: Option<String>,
}

impl Graph {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: GraphKind) -> Self {
        Self {
            id: id.into(),
            kind,
            data: BTreeMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            last_event_id: None,
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Number of incoming edges at a node.
    #[must_use]
    pub fn in_degree(&self, node_id: &str) -> usize {
        self.edges.iter().filter(|e| e.target == node_id).count()
    }

    /// Add a node.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when a node with the same id is present.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(CoreError::AlreadyExists {
                id: node.id.clone(),
            });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Shallow-merge `changes` into the node's payload.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when the id is absent; `KindMismatch` when the stored
    /// kind differs from `kind`; `CorruptDocument` when the merged payload
    /// no longer satisfies the kind's schema.
    pub fn update_node(
        &mut self,
        id: &str,
        kind: NodeKind,
        changes: &BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| CoreError::NodeNotFound { id: id.to_string() })?;
        if node.kind != kind {
            return Err(CoreError::KindMismatch {
                id: id.to_string(),
                expected: kind.to_string(),
                stored: node.kind.to_string(),
            });
        }
        node.data = node
            .data
            .merged(changes)
            .map_err(|e| CoreError::corrupt(id, &e))?;
        Ok(())
    }

    /// Remove a node. The kind must match what is stored.
    ///
    /// Edges touching the node are left in place — cascade is a caller
    /// responsibility.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` or `KindMismatch`.
    pub fn remove_node(&mut self, id: &str, kind: NodeKind) -> Result<Node> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| CoreError::NodeNotFound { id: id.to_string() })?;
        if self.nodes[pos].kind != kind {
            return Err(CoreError::KindMismatch {
                id: id.to_string(),
                expected: kind.to_string(),
                stored: self.nodes[pos].kind.to_string(),
            });
        }
        Ok(self.nodes.remove(pos))
    }

    /// Add an edge.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when an edge with the same id is present;
    /// `NodeNotFound` when either endpoint is absent.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if self.edge(&edge.id).is_some() {
            return Err(CoreError::AlreadyExists { id: edge.id.clone() });
        }
        for endpoint in [&edge.source, &edge.target] {
            if self.node(endpoint).is_none() {
                return Err(CoreError::NodeNotFound {
                    id: endpoint.clone(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Remove an edge by id.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` when the id is absent.
    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::EdgeNotFound { id: id.to_string() })?;
        Ok(self.edges.remove(pos))
    }

    /// Whether an edge `source -> target` would be valid on this graph.
    /// Pure: never mutates the graph.
    #[must_use]
    pub fn can_connect(&self, source_id: &str, target_id: &str) -> bool {
        connect::can_connect(self, source_id, target_id)
    }
}
