//! Command surface consumed by the UI layer.
//!
//! Each command applies its mutation and appends the matching success event
//! inside one transaction: observers on other clients never see a mutation
//! without its event or an event without its mutation. Failed commands
//! reach neither the store nor the log.

use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeMap;

use tracing::debug;

use crate::clock;
use crate::error::{CoreError, Result};
use crate::event::{
    CreateEdgeData, CreateNodeData, DeleteEdgeData, DeleteGraphData, DeleteNodeData, Event,
    EventData, EventDraft, UpdateGraphData, UpdateNodeData,
};
use crate::graph::{Edge, Node};
use crate::model::NodeKind;
use crate::store::{events, graphs};

/// Add a node to a graph and record `createNodeSuccess`.
///
/// # Errors
///
/// `GraphNotFound`, `AlreadyExists`, or a store failure.
pub fn create_node(conn: &mut Connection, graph_id: &str, node: Node) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Existence probe keeps the failure typed instead of a bare FK error.
    graphs::last_event_id(&tx, graph_id)?;
    graphs::insert_node(&tx, graph_id, &node)?;

    let event = seal(EventDraft::new(
        EventData::CreateNode(CreateNodeData {
            graph_id: graph_id.to_string(),
            node_id: node.id.clone(),
            kind: node.kind,
            data: node.data.clone(),
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, node_id = %node.id, kind = %node.kind, "node created");
    Ok(event)
}

/// Shallow-update a node and record `updateNodeSuccess`.
///
/// # Errors
///
/// `NodeNotFound`, `KindMismatch`, `CorruptDocument`, or a store failure.
pub fn update_node(
    conn: &mut Connection,
    graph_id: &str,
    node_id: &str,
    kind: NodeKind,
    changes: BTreeMap<String, serde_json::Value>,
) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    graphs::update_node(&tx, graph_id, node_id, kind, &changes)?;

    let event = seal(EventDraft::new(
        EventData::UpdateNode(UpdateNodeData {
            graph_id: graph_id.to_string(),
            node_id: node_id.to_string(),
            kind,
            changes,
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, node_id, "node updated");
    Ok(event)
}

/// Remove a node and record `deleteNodeSuccess`.
///
/// Edges referencing the node are not removed here — cascade is the
/// caller's decision.
///
/// # Errors
///
/// `NodeNotFound`, `KindMismatch`, or a store failure.
pub fn delete_node(
    conn: &mut Connection,
    graph_id: &str,
    node_id: &str,
    kind: NodeKind,
) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    graphs::delete_node(&tx, graph_id, node_id, kind)?;

    let event = seal(EventDraft::new(
        EventData::DeleteNode(DeleteNodeData {
            graph_id: graph_id.to_string(),
            node_id: node_id.to_string(),
            kind,
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, node_id, "node deleted");
    Ok(event)
}

/// Add an edge and record `createEdgeSuccess`.
///
/// The connection rules are re-evaluated against the graph state this
/// transaction reads, not whatever the UI had on screen.
///
/// # Errors
///
/// `GraphNotFound`, `ConnectionRejected`, `AlreadyExists`, or a store
/// failure.
pub fn create_edge(conn: &mut Connection, graph_id: &str, edge: Edge) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let graph = graphs::get_graph(&tx, graph_id)?;
    if !graph.can_connect(&edge.source, &edge.target) {
        return Err(CoreError::ConnectionRejected {
            from: edge.source,
            target: edge.target,
        });
    }
    graphs::insert_edge(&tx, graph_id, &edge)?;

    let event = seal(EventDraft::new(
        EventData::CreateEdge(CreateEdgeData {
            graph_id: graph_id.to_string(),
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, edge_id = %edge.id, "edge created");
    Ok(event)
}

/// Remove an edge and record `deleteEdgeSuccess`.
///
/// # Errors
///
/// `EdgeNotFound` or a store failure.
pub fn delete_edge(conn: &mut Connection, graph_id: &str, edge_id: &str) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    graphs::delete_edge(&tx, graph_id, edge_id)?;

    let event = seal(EventDraft::new(
        EventData::DeleteEdge(DeleteEdgeData {
            graph_id: graph_id.to_string(),
            edge_id: edge_id.to_string(),
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, edge_id, "edge deleted");
    Ok(event)
}

/// Shallow-update a graph's data and record `updateGraphSuccess`.
///
/// # Errors
///
/// `GraphNotFound`, `CorruptDocument`, or a store failure.
pub fn update_graph(
    conn: &mut Connection,
    graph_id: &str,
    changes: BTreeMap<String, serde_json::Value>,
) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    graphs::update_graph_data(&tx, graph_id, &changes)?;

    let event = seal(EventDraft::new(
        EventData::UpdateGraph(UpdateGraphData {
            graph_id: graph_id.to_string(),
            changes,
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, "graph updated");
    Ok(event)
}

/// Delete a graph (nodes and edges cascade) and record
/// `deleteGraphSuccess`.
///
/// # Errors
///
/// `GraphNotFound` or a store failure.
pub fn delete_graph(conn: &mut Connection, graph_id: &str) -> Result<Event> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    graphs::delete_graph(&tx, graph_id)?;

    let event = seal(EventDraft::new(
        EventData::DeleteGraph(DeleteGraphData {
            graph_id: graph_id.to_string(),
        }),
        clock::now_us(),
    ))?;
    events::insert_event(&tx, &event)?;
    tx.commit()?;

    debug!(graph_id, "graph deleted");
    Ok(event)
}

fn seal(draft: EventDraft) -> Result<Event> {
    draft.seal().map_err(|e| CoreError::CorruptDocument {
        id: "<draft>".to_string(),
        reason: e.to_string(),
    })
}
