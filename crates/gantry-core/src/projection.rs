//! Local reconciliation cache.
//!
//! A keyed map from record id to last-known value, fed by two write paths:
//! optimistic local writes (applied immediately and unconditionally) and
//! remote events delivered by the watermark tracker (kind-dispatched and
//! shallow-merged). Observers subscribe per id and receive every change as
//! a push; dropping the receiver is the cancellation — a component
//! navigating away just stops listening, it never interrupts the write.
//!
//! The merge between the two paths is last-write-wins by arrival order, with
//! no reconciliation by logical/event time. A remote event that is logically
//! older than a local optimistic write can therefore clobber it when it
//! arrives later; ordering merges by event timestamp would close that gap at
//! the cost of keeping per-field stamps.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{Receiver, Sender, channel};

use tracing::warn;

use crate::event::{Event, EventData};
use crate::model::NodeKind;

/// The cache operation a remote event implies for one record.
#[derive(Debug, Clone)]
pub enum CacheOp<T: Reconcile> {
    /// Replace (or insert) the record wholesale.
    Put(T),
    /// Patch the existing record in place.
    Patch(T::Patch),
    /// Drop the record.
    Remove,
}

/// A cacheable read-model record that knows how to fold remote events into
/// itself.
pub trait Reconcile: Clone {
    /// The shape of a partial update for this record type.
    type Patch: Clone + std::fmt::Debug;

    /// Extract the record id and cache operation this event implies, or
    /// `None` when the event does not address this record type.
    fn update_for(event: &Event) -> Option<(String, CacheOp<Self>)>;

    /// Apply a patch in place. Returns `false` when the patch is stale or
    /// wrong-typed and must be skipped.
    fn apply_patch(&mut self, patch: &Self::Patch) -> bool;
}

/// Generic keyed projection with per-id observers.
#[derive(Debug)]
pub struct Projection<T: Reconcile> {
    records: HashMap<String, T>,
    observers: HashMap<String, Vec<Sender<Option<T>>>>,
}

impl<T: Reconcile> Default for Projection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reconcile> Projection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    /// Seed the projection from a bulk load (e.g. a full graph reload).
    pub fn load(&mut self, records: impl IntoIterator<Item = (String, T)>) {
        for (id, record) in records {
            self.records.insert(id.clone(), record);
            self.notify(&id);
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Observe one record id. Every subsequent change to the record is
    /// pushed to the returned receiver (`None` on removal). Dropping the
    /// receiver cancels the subscription.
    pub fn subscribe(&mut self, id: impl Into<String>) -> Receiver<Option<T>> {
        let (sender, receiver) = channel();
        self.observers.entry(id.into()).or_default().push(sender);
        receiver
    }

    /// Optimistic local write: applied immediately and unconditionally.
    pub fn apply_local(&mut self, id: impl Into<String>, value: T) {
        let id = id.into();
        self.records.insert(id.clone(), value);
        self.notify(&id);
    }

    /// Optimistic local removal.
    pub fn remove_local(&mut self, id: &str) {
        if self.records.remove(id).is_some() {
            self.notify(id);
        }
    }

    /// Fold a remote event into the cache. Returns `true` when a record
    /// changed. Events that address a record this cache has never seen (or
    /// that fail the record's own staleness check) are skipped with a
    /// warning rather than aborting catch-up.
    pub fn apply_remote(&mut self, event: &Event) -> bool {
        let Some((id, op)) = T::update_for(event) else {
            return false;
        };

        let changed = match op {
            CacheOp::Put(value) => {
                self.records.insert(id.clone(), value);
                true
            }
            CacheOp::Patch(patch) => match self.records.get_mut(&id) {
                Some(record) => record.apply_patch(&patch),
                None => {
                    warn!(
                        event_id = %event.id,
                        record_id = %id,
                        "skipping patch for unknown record"
                    );
                    false
                }
            },
            CacheOp::Remove => self.records.remove(&id).is_some(),
        };

        if changed {
            self.notify(&id);
        }
        changed
    }

    fn notify(&mut self, id: &str) {
        let Some(senders) = self.observers.get_mut(id) else {
            return;
        };
        let value = self.records.get(id).cloned();
        // A send failure means the receiver was dropped — the subscription
        // was cancelled, so forget the sender.
        senders.retain(|s| s.send(value.clone()).is_ok());
        if senders.is_empty() {
            self.observers.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// NodeRecord — the node cache fed by graph events
// ---------------------------------------------------------------------------

/// Cached read-model for one graph node.
///
/// The payload is kept as the raw wire map: the cache is a projection for
/// rendering, not the typed domain value, and shallow merges stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub kind: NodeKind,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// A kind-guarded shallow change set for a [`NodeRecord`].
#[derive(Debug, Clone)]
pub struct NodePatch {
    pub kind: NodeKind,
    pub changes: BTreeMap<String, serde_json::Value>,
}

impl Reconcile for NodeRecord {
    type Patch = NodePatch;

    fn update_for(event: &Event) -> Option<(String, CacheOp<Self>)> {
        match &event.payload {
            EventData::CreateNode(d) => {
                let data = match d.data.to_json_value() {
                    Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
                    Ok(_) | Err(_) => {
                        warn!(event_id = %event.id, "unusable node payload in create event");
                        return None;
                    }
                };
                Some((
                    d.node_id.clone(),
                    CacheOp::Put(Self {
                        id: d.node_id.clone(),
                        kind: d.kind,
                        data,
                    }),
                ))
            }
            EventData::UpdateNode(d) => Some((
                d.node_id.clone(),
                CacheOp::Patch(NodePatch {
                    kind: d.kind,
                    changes: d.changes.clone(),
                }),
            )),
            EventData::DeleteNode(d) => Some((d.node_id.clone(), CacheOp::Remove)),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) -> bool {
        if patch.kind != self.kind {
            warn!(
                record_id = %self.id,
                expected = %patch.kind,
                stored = %self.kind,
                "skipping wrong-kind patch"
            );
            return false;
        }
        for (key, value) in &patch.changes {
            self.data.insert(key.clone(), value.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        CreateNodeData, DeleteNodeData, EventDraft, UpdateNodeData,
    };
    use crate::model::{FieldData, FieldType, NodeData};
    use serde_json::json;

    fn create_field_event(node_id: &str, ts: i64) -> Event {
        EventDraft::new(
            EventData::CreateNode(CreateNodeData {
                graph_id: "g1".into(),
                node_id: node_id.into(),
                kind: NodeKind::Field,
                data: NodeData::Field(FieldData {
                    name: "amount".into(),
                    field_type: FieldType::U64,
                    extra: BTreeMap::new(),
                }),
            }),
            ts,
        )
        .seal()
        .expect("seal")
    }

    fn update_event(node_id: &str, kind: NodeKind, ts: i64) -> Event {
        EventDraft::new(
            EventData::UpdateNode(UpdateNodeData {
                graph_id: "g1".into(),
                node_id: node_id.into(),
                kind,
                changes: BTreeMap::from([("name".to_string(), json!("lamports"))]),
            }),
            ts,
        )
        .seal()
        .expect("seal")
    }

    fn delete_event(node_id: &str, ts: i64) -> Event {
        EventDraft::new(
            EventData::DeleteNode(DeleteNodeData {
                graph_id: "g1".into(),
                node_id: node_id.into(),
                kind: NodeKind::Field,
            }),
            ts,
        )
        .seal()
        .expect("seal")
    }

    #[test]
    fn remote_create_then_update_then_delete() {
        let mut cache: Projection<NodeRecord> = Projection::new();

        assert!(cache.apply_remote(&create_field_event("n1", 10)));
        assert_eq!(cache.get("n1").expect("record").data["name"], json!("amount"));

        assert!(cache.apply_remote(&update_event("n1", NodeKind::Field, 20)));
        assert_eq!(cache.get("n1").expect("record").data["name"], json!("lamports"));
        // Unnamed keys survive the shallow merge.
        assert_eq!(cache.get("n1").expect("record").data["type"], json!("u64"));

        assert!(cache.apply_remote(&delete_event("n1", 30)));
        assert!(cache.get("n1").is_none());
    }

    #[test]
    fn wrong_kind_patch_is_skipped() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        cache.apply_remote(&create_field_event("n1", 10));

        assert!(!cache.apply_remote(&update_event("n1", NodeKind::Account, 20)));
        assert_eq!(cache.get("n1").expect("record").data["name"], json!("amount"));
    }

    #[test]
    fn patch_for_unknown_record_is_skipped() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        assert!(!cache.apply_remote(&update_event("ghost", NodeKind::Field, 10)));
    }

    #[test]
    fn observers_see_every_change() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        let rx = cache.subscribe("n1");

        cache.apply_remote(&create_field_event("n1", 10));
        cache.apply_remote(&delete_event("n1", 20));

        let first = rx.try_recv().expect("first push").expect("value");
        assert_eq!(first.kind, NodeKind::Field);
        let second = rx.try_recv().expect("second push");
        assert!(second.is_none());
    }

    #[test]
    fn dropped_receiver_cancels_subscription() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        let rx = cache.subscribe("n1");
        drop(rx);

        cache.apply_remote(&create_field_event("n1", 10));
        // The dead sender was pruned; a fresh subscription still works.
        let rx = cache.subscribe("n1");
        cache.apply_remote(&update_event("n1", NodeKind::Field, 20));
        assert!(rx.try_recv().expect("push").is_some());
    }

    #[test]
    fn local_write_wins_by_arrival_order() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        cache.apply_remote(&create_field_event("n1", 10));

        // Optimistic local rename...
        let mut local = cache.get("n1").expect("record").clone();
        local.data.insert("name".to_string(), json!("local"));
        cache.apply_local("n1", local);

        // ...then a remote event with an *older* timestamp arrives late and
        // still overwrites: arrival order is the only order.
        cache.apply_remote(&update_event("n1", NodeKind::Field, 5));
        assert_eq!(cache.get("n1").expect("record").data["name"], json!("lamports"));
    }

    #[test]
    fn unrelated_events_do_not_touch_the_cache() {
        let mut cache: Projection<NodeRecord> = Projection::new();
        let event = EventDraft::new(
            EventData::DeleteGraph(crate::event::DeleteGraphData {
                graph_id: "g1".into(),
            }),
            10,
        )
        .seal()
        .expect("seal");
        assert!(!cache.apply_remote(&event));
    }
}
