use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::CoreError;
use gantry_core::event::EventType;
use gantry_core::store;
use gantry_core::sync::GraphTracker;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Graph id to catch up.
    #[arg(long)]
    graph: String,

    /// Event types to consider, comma-separated. Empty means all.
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// On an invalid watermark, jump to the log head instead of failing.
    #[arg(long)]
    reset: bool,
}

#[derive(Serialize)]
struct SyncReport {
    applied: Option<String>,
    event_type: Option<String>,
    watermark: Option<String>,
}

/// Run one single-hop catch-up step: locate the next relevant event past
/// the graph's watermark and advance to it.
pub fn run(args: &SyncArgs, db_path: &Path, mode: OutputMode) -> Result<()> {
    let conn = store::open_store(db_path)?;

    let filter: Vec<EventType> = args
        .types
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()
        .context("parse event type filter")?;

    let mut tracker = GraphTracker::resume(&conn, &args.graph)?;
    let found = match tracker.poll_next(&conn, &filter) {
        Ok(found) => found,
        Err(CoreError::WatermarkInvalid { id }) if args.reset => {
            tracing::warn!(watermark = %id, "invalid watermark, resetting to log head");
            tracker.reset_to_head(&conn)?;
            None
        }
        Err(e) => return Err(e.into()),
    };

    let report = SyncReport {
        applied: found.as_ref().map(|e| e.id.clone()),
        event_type: found.as_ref().map(|e| e.event_type.to_string()),
        watermark: tracker.watermark().map(str::to_string),
    };
    emit(mode, &report, |r| match (&r.applied, &r.watermark) {
        (Some(id), _) => format!(
            "applied {} ({id})",
            r.event_type.as_deref().unwrap_or_default()
        ),
        (None, Some(wm)) => format!("settled at {wm}"),
        (None, None) => "settled, log empty".to_string(),
    })
}
