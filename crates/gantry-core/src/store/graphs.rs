//! Graph persistence.
//!
//! The graph row carries the graph's own data and its `last_event_id`
//! watermark — the single source of truth for how much of the event log the
//! graph has applied. Nodes and edges live in their own tables and are
//! written independently of the row.

use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;

use crate::clock;
use crate::error::{CoreError, Result};
use crate::graph::{Edge, Graph, GraphKind, Node};
use crate::model::{NodeData, NodeKind};

/// Insert a new graph row. Any nodes/edges already present on the value are
/// persisted along with it.
///
/// # Errors
///
/// `AlreadyExists` when the id is taken.
pub fn create_graph(conn: &mut Connection, graph: &Graph) -> Result<()> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    let taken: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM graphs WHERE graph_id = ?1)",
        params![graph.id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(CoreError::AlreadyExists {
            id: graph.id.clone(),
        });
    }

    let now = clock::now_us();
    tx.execute(
        "INSERT INTO graphs (graph_id, kind, data, last_event_id, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            graph.id,
            graph.kind.as_str(),
            encode_json(&graph.id, &graph.data)?,
            graph.last_event_id,
            now,
        ],
    )?;
    for node in &graph.nodes {
        insert_node(&tx, &graph.id, node)?;
    }
    for edge in &graph.edges {
        insert_edge(&tx, &graph.id, edge)?;
    }
    tx.commit()?;
    Ok(())
}

/// Load a graph with its node and edge sub-collections.
///
/// # Errors
///
/// `GraphNotFound` when the id is absent; `CorruptDocument` when stored
/// JSON fails to decode.
pub fn get_graph(conn: &Connection, id: &str) -> Result<Graph> {
    let row = conn
        .query_row(
            "SELECT kind, data, last_event_id FROM graphs WHERE graph_id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((kind_raw, data_raw, last_event_id)) = row else {
        return Err(CoreError::GraphNotFound { id: id.to_string() });
    };

    let kind: GraphKind = kind_raw.parse().map_err(|_| CoreError::CorruptDocument {
        id: id.to_string(),
        reason: format!("unknown graph kind '{kind_raw}'"),
    })?;
    let data: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&data_raw).map_err(|e| CoreError::CorruptDocument {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Graph {
        id: id.to_string(),
        kind,
        data,
        nodes: load_nodes(conn, id)?,
        edges: load_edges(conn, id)?,
        last_event_id,
    })
}

/// Delete a graph row; nodes and edges cascade via foreign keys.
///
/// # Errors
///
/// `GraphNotFound` when the id is absent.
pub fn delete_graph(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM graphs WHERE graph_id = ?1", params![id])?;
    if changed == 0 {
        return Err(CoreError::GraphNotFound { id: id.to_string() });
    }
    Ok(())
}

/// Read a graph's persisted watermark.
///
/// # Errors
///
/// `GraphNotFound` when the id is absent.
pub fn last_event_id(conn: &Connection, graph_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT last_event_id FROM graphs WHERE graph_id = ?1",
        params![graph_id],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()?
    .ok_or_else(|| CoreError::GraphNotFound {
        id: graph_id.to_string(),
    })
}

/// Advance a graph's persisted watermark.
///
/// # Errors
///
/// `GraphNotFound` when the id is absent.
pub fn set_last_event_id(conn: &Connection, graph_id: &str, event_id: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE graphs SET last_event_id = ?2, updated_at_us = ?3 WHERE graph_id = ?1",
        params![graph_id, event_id, clock::now_us()],
    )?;
    if changed == 0 {
        return Err(CoreError::GraphNotFound {
            id: graph_id.to_string(),
        });
    }
    Ok(())
}

/// Shallow-merge `changes` into a graph's data document.
///
/// # Errors
///
/// `GraphNotFound` when the id is absent; `CorruptDocument` on decode
/// failure.
pub fn update_graph_data(
    conn: &Connection,
    graph_id: &str,
    changes: &BTreeMap<String, serde_json::Value>,
) -> Result<()> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT data FROM graphs WHERE graph_id = ?1",
            params![graph_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Err(CoreError::GraphNotFound {
            id: graph_id.to_string(),
        });
    };

    let mut data: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(|e| CoreError::CorruptDocument {
            id: graph_id.to_string(),
            reason: e.to_string(),
        })?;
    for (key, value) in changes {
        data.insert(key.clone(), value.clone());
    }

    conn.execute(
        "UPDATE graphs SET data = ?2, updated_at_us = ?3 WHERE graph_id = ?1",
        params![graph_id, encode_json(graph_id, &data)?, clock::now_us()],
    )?;
    Ok(())
}

/// Insert a node row. `conn` may be a live transaction.
///
/// # Errors
///
/// `AlreadyExists` when the node id is taken on this graph.
pub fn insert_node(conn: &Connection, graph_id: &str, node: &Node) -> Result<()> {
    let data = node
        .data
        .to_json_value()
        .map_err(|e| CoreError::CorruptDocument {
            id: node.id.clone(),
            reason: e.to_string(),
        })?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO graph_nodes (graph_id, node_id, kind, data) VALUES (?1, ?2, ?3, ?4)",
        params![graph_id, node.id, node.kind.as_str(), data.to_string()],
    )?;
    if inserted == 0 {
        return Err(CoreError::AlreadyExists {
            id: node.id.clone(),
        });
    }
    Ok(())
}

/// Shallow-merge `changes` into a stored node's payload. The stored kind
/// must match `kind`.
///
/// # Errors
///
/// `NodeNotFound`, `KindMismatch`, or `CorruptDocument`.
pub fn update_node(
    conn: &Connection,
    graph_id: &str,
    node_id: &str,
    kind: NodeKind,
    changes: &BTreeMap<String, serde_json::Value>,
) -> Result<()> {
    let stored = read_node(conn, graph_id, node_id)?;
    if stored.kind != kind {
        return Err(CoreError::KindMismatch {
            id: node_id.to_string(),
            expected: kind.to_string(),
            stored: stored.kind.to_string(),
        });
    }

    let merged = stored
        .data
        .merged(changes)
        .map_err(|e| CoreError::corrupt(node_id, &e))?;
    let data = merged
        .to_json_value()
        .map_err(|e| CoreError::CorruptDocument {
            id: node_id.to_string(),
            reason: e.to_string(),
        })?;
    conn.execute(
        "UPDATE graph_nodes SET data = ?3 WHERE graph_id = ?1 AND node_id = ?2",
        params![graph_id, node_id, data.to_string()],
    )?;
    Ok(())
}

/// Delete a node row. The stored kind must match `kind`. Edges touching
/// the node are left in place — cascade is a caller responsibility.
///
/// # Errors
///
/// `NodeNotFound` or `KindMismatch`.
pub fn delete_node(
    conn: &Connection,
    graph_id: &str,
    node_id: &str,
    kind: NodeKind,
) -> Result<()> {
    let stored = read_node(conn, graph_id, node_id)?;
    if stored.kind != kind {
        return Err(CoreError::KindMismatch {
            id: node_id.to_string(),
            expected: kind.to_string(),
            stored: stored.kind.to_string(),
        });
    }
    conn.execute(
        "DELETE FROM graph_nodes WHERE graph_id = ?1 AND node_id = ?2",
        params![graph_id, node_id],
    )?;
    Ok(())
}

/// Insert an edge row. `conn` may be a live transaction.
///
/// # Errors
///
/// `AlreadyExists` when the edge id is taken on this graph.
pub fn insert_edge(conn: &Connection, graph_id: &str, edge: &Edge) -> Result<()> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO graph_edges (graph_id, edge_id, source_id, target_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![graph_id, edge.id, edge.source, edge.target],
    )?;
    if inserted == 0 {
        return Err(CoreError::AlreadyExists { id: edge.id.clone() });
    }
    Ok(())
}

/// Delete an edge row.
///
/// # Errors
///
/// `EdgeNotFound` when the id is absent on this graph.
pub fn delete_edge(conn: &Connection, graph_id: &str, edge_id: &str) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM graph_edges WHERE graph_id = ?1 AND edge_id = ?2",
        params![graph_id, edge_id],
    )?;
    if changed == 0 {
        return Err(CoreError::EdgeNotFound {
            id: edge_id.to_string(),
        });
    }
    Ok(())
}

fn read_node(conn: &Connection, graph_id: &str, node_id: &str) -> Result<Node> {
    let row = conn
        .query_row(
            "SELECT kind, data FROM graph_nodes WHERE graph_id = ?1 AND node_id = ?2",
            params![graph_id, node_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((kind_raw, data_raw)) = row else {
        return Err(CoreError::NodeNotFound {
            id: node_id.to_string(),
        });
    };
    decode_node(node_id, &kind_raw, &data_raw)
}

fn load_nodes(conn: &Connection, graph_id: &str) -> Result<Vec<Node>> {
    let mut stmt = conn.prepare(
        "SELECT node_id, kind, data FROM graph_nodes WHERE graph_id = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![graph_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut nodes = Vec::new();
    for row in rows {
        let (node_id, kind_raw, data_raw) = row?;
        nodes.push(decode_node(&node_id, &kind_raw, &data_raw)?);
    }
    Ok(nodes)
}

fn load_edges(conn: &Connection, graph_id: &str) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(
        "SELECT edge_id, source_id, target_id FROM graph_edges
         WHERE graph_id = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![graph_id], |row| {
        Ok(Edge {
            id: row.get(0)?,
            source: row.get(1)?,
            target: row.get(2)?,
        })
    })?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(row?);
    }
    Ok(edges)
}

fn decode_node(node_id: &str, kind_raw: &str, data_raw: &str) -> Result<Node> {
    let corrupt = |reason: String| CoreError::CorruptDocument {
        id: node_id.to_string(),
        reason,
    };

    let kind: NodeKind = kind_raw
        .parse()
        .map_err(|_| corrupt(format!("unknown node kind '{kind_raw}'")))?;
    let value: serde_json::Value =
        serde_json::from_str(data_raw).map_err(|e| corrupt(e.to_string()))?;
    let data = NodeData::deserialize_for(kind, value).map_err(|e| corrupt(e.to_string()))?;

    Ok(Node {
        id: node_id.to_string(),
        kind,
        data,
    })
}

fn encode_json<T: serde::Serialize>(id: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CoreError::CorruptDocument {
        id: id.to_string(),
        reason: e.to_string(),
    })
}
