//! Per-graph watermark tracker.
//!
//! A tracker is a two-state machine: `Settled` (fully caught up to the
//! event its watermark names) or `CatchingUp` (in the middle of locating
//! and applying exactly one more event). Catch-up is single-hop by
//! construction — one event per poll — which keeps the invariant easy to
//! state: the projection is always either caught up to a specific,
//! nameable event, or applying exactly one more.
//!
//! The watermark is persisted on the graph row (`last_event_id`) *before*
//! the event is handed to the caller, so a crash between advance and apply
//! re-delivers nothing; the projection may miss one event's worth of
//! changes until the next full reload.

use rusqlite::Connection;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::event::{Event, EventType};
use crate::store::{events, graphs};

/// Tracker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Fully caught up to the current watermark.
    Settled,
    /// Locating/applying the next event.
    CatchingUp,
}

/// Watermark tracker for one graph projection.
#[derive(Debug)]
pub struct GraphTracker {
    graph_id: String,
    watermark: Option<String>,
    state: TrackerState,
}

impl GraphTracker {
    /// Resume tracking from the graph's persisted watermark.
    ///
    /// # Errors
    ///
    /// `GraphNotFound` when the graph row is absent.
    pub fn resume(conn: &Connection, graph_id: impl Into<String>) -> Result<Self> {
        let graph_id = graph_id.into();
        let watermark = graphs::last_event_id(conn, &graph_id)?;
        Ok(Self {
            graph_id,
            watermark,
            state: TrackerState::Settled,
        })
    }

    #[must_use]
    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// The id of the last event this projection has incorporated.
    #[must_use]
    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Locate the next relevant event past the watermark. On a hit the
    /// watermark advances (in memory and on the graph row) before the event
    /// is returned; on a miss the tracker settles where it is and the
    /// caller should poll again later.
    ///
    /// An empty `filter` matches every event type.
    ///
    /// # Errors
    ///
    /// `WatermarkInvalid` when the current watermark names an event the log
    /// cannot read — the caller must fall back to a full reload (see
    /// [`reset_to_head`](Self::reset_to_head)) instead of retrying the
    /// incremental path.
    pub fn poll_next(
        &mut self,
        conn: &Connection,
        filter: &[EventType],
    ) -> Result<Option<Event>> {
        self.state = TrackerState::CatchingUp;

        let found =
            events::next_event_after(conn, &self.graph_id, self.watermark.as_deref(), filter);
        match found {
            Ok(Some(event)) => {
                graphs::set_last_event_id(conn, &self.graph_id, &event.id)?;
                debug!(
                    graph_id = %self.graph_id,
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "watermark advanced"
                );
                self.watermark = Some(event.id.clone());
                self.state = TrackerState::Settled;
                Ok(Some(event))
            }
            Ok(None) => {
                self.state = TrackerState::Settled;
                Ok(None)
            }
            Err(e) => {
                if matches!(e, CoreError::WatermarkInvalid { .. }) {
                    warn!(graph_id = %self.graph_id, error = %e, "watermark unreadable");
                }
                Err(e)
            }
        }
    }

    /// Full-reload fallback: jump the watermark to the newest event
    /// currently referencing this graph (or clear it when the log holds
    /// none) and persist the new position. The caller pairs this with
    /// reloading the graph document itself.
    ///
    /// # Errors
    ///
    /// `GraphNotFound` when the graph row is absent.
    pub fn reset_to_head(&mut self, conn: &Connection) -> Result<()> {
        let head = events::recent_events(conn, &self.graph_id, 1)?
            .into_iter()
            .next();
        match head {
            Some(event) => {
                graphs::set_last_event_id(conn, &self.graph_id, &event.id)?;
                self.watermark = Some(event.id);
            }
            None => {
                self.watermark = None;
            }
        }
        self.state = TrackerState::Settled;
        debug!(graph_id = %self.graph_id, watermark = ?self.watermark, "tracker reset to head");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeleteEdgeData, EventData, EventDraft};
    use crate::graph::{Graph, GraphKind};
    use crate::store::{events::append_event, graphs::create_graph, open_in_memory};

    fn delete_edge(graph: &str, edge: &str, ts: i64) -> EventDraft {
        EventDraft::new(
            EventData::DeleteEdge(DeleteEdgeData {
                graph_id: graph.into(),
                edge_id: edge.into(),
            }),
            ts,
        )
    }

    fn setup() -> Connection {
        let mut conn = open_in_memory().expect("open store");
        create_graph(&mut conn, &Graph::new("g1", GraphKind::Program)).expect("create graph");
        conn
    }

    #[test]
    fn poll_walks_the_log_in_order() {
        let mut conn = setup();
        let a = append_event(&mut conn, delete_edge("g1", "e1", 10)).expect("append");
        let b = append_event(&mut conn, delete_edge("g1", "e2", 20)).expect("append");

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        assert_eq!(tracker.watermark(), None);

        let first = tracker.poll_next(&conn, &[]).expect("poll").expect("event");
        assert_eq!(first.id, a.id);
        assert_eq!(tracker.watermark(), Some(a.id.as_str()));

        let second = tracker.poll_next(&conn, &[]).expect("poll").expect("event");
        assert_eq!(second.id, b.id);

        assert!(tracker.poll_next(&conn, &[]).expect("poll").is_none());
        assert_eq!(tracker.state(), TrackerState::Settled);
    }

    #[test]
    fn watermark_survives_tracker_restart() {
        let mut conn = setup();
        let a = append_event(&mut conn, delete_edge("g1", "e1", 10)).expect("append");
        let b = append_event(&mut conn, delete_edge("g1", "e2", 20)).expect("append");

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        let first = tracker.poll_next(&conn, &[]).expect("poll").expect("event");
        assert_eq!(first.id, a.id);
        drop(tracker);

        // A fresh tracker resumes from the persisted watermark.
        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        assert_eq!(tracker.watermark(), Some(a.id.as_str()));
        let next = tracker.poll_next(&conn, &[]).expect("poll").expect("event");
        assert_eq!(next.id, b.id);
    }

    #[test]
    fn watermarks_are_strictly_increasing() {
        let mut conn = setup();
        for (edge, ts) in [("e1", 10), ("e2", 10), ("e3", 30)] {
            append_event(&mut conn, delete_edge("g1", edge, ts)).expect("append");
        }

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        let mut seen = Vec::new();
        while let Some(event) = tracker.poll_next(&conn, &[]).expect("poll") {
            seen.push((event.created_at_us, event.id));
        }
        assert_eq!(seen.len(), 3);
        // Timestamps never decrease, and re-polling past the end stays dry.
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(tracker.poll_next(&conn, &[]).expect("poll").is_none());
    }

    #[test]
    fn invalid_watermark_surfaces_then_reset_recovers() {
        let mut conn = setup();
        append_event(&mut conn, delete_edge("g1", "e1", 10)).expect("append");
        let b = append_event(&mut conn, delete_edge("g1", "e2", 20)).expect("append");

        // Simulate a watermark pointing at an event this log cannot read.
        crate::store::graphs::set_last_event_id(&conn, "g1", "blake3:gone").expect("set");

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        let err = tracker.poll_next(&conn, &[]).unwrap_err();
        assert!(matches!(err, CoreError::WatermarkInvalid { .. }));

        tracker.reset_to_head(&conn).expect("reset");
        assert_eq!(tracker.watermark(), Some(b.id.as_str()));
        assert!(tracker.poll_next(&conn, &[]).expect("poll").is_none());
    }

    #[test]
    fn reset_on_empty_log_clears_watermark() {
        let conn = setup();
        crate::store::graphs::set_last_event_id(&conn, "g1", "blake3:gone").expect("set");

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        tracker.reset_to_head(&conn).expect("reset");
        assert_eq!(tracker.watermark(), None);
    }

    #[test]
    fn type_filter_narrows_catchup() {
        let mut conn = setup();
        append_event(&mut conn, delete_edge("g1", "e1", 10)).expect("append");

        let mut tracker = GraphTracker::resume(&conn, "g1").expect("resume");
        let none = tracker
            .poll_next(&conn, &[EventType::DeleteGraph])
            .expect("poll");
        assert!(none.is_none());
        // The filtered poll must not advance past the unmatched event.
        assert_eq!(tracker.watermark(), None);
    }
}
