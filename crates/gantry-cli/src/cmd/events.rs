use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::store::{self, events};

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Reference id (graph or entity) to filter on.
    #[arg(long = "ref")]
    reference: String,

    /// Maximum number of events to show, newest first.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

pub fn run(args: &EventsArgs, db_path: &Path, mode: OutputMode) -> Result<()> {
    let conn = store::open_store(db_path)?;
    let list = events::recent_events(&conn, &args.reference, args.limit)?;

    emit(mode, &list, |events| {
        if events.is_empty() {
            return format!("no events reference '{}'", args.reference);
        }
        events
            .iter()
            .map(|e| format!("{}  {}  {}", e.created_at_us, e.event_type, e.id))
            .collect::<Vec<_>>()
            .join("\n")
    })
}
