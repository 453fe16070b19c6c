use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::commands;
use gantry_core::graph::Edge;
use gantry_core::store::{self, graphs};

#[derive(Subcommand, Debug)]
pub enum EdgeCmd {
    #[command(about = "Add an edge (validated against the connection rules)")]
    Add(AddArgs),
    #[command(about = "Remove an edge")]
    Rm(RmArgs),
    #[command(about = "Check whether a connection would be valid")]
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Edge id.
    #[arg(long)]
    id: String,

    /// Source node id.
    #[arg(long)]
    source: String,

    /// Target node id.
    #[arg(long)]
    target: String,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Edge id.
    #[arg(long)]
    id: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Source node id.
    #[arg(long)]
    source: String,

    /// Target node id.
    #[arg(long)]
    target: String,
}

#[derive(Serialize)]
struct CheckReport {
    source: String,
    target: String,
    allowed: bool,
}

pub fn run(cmd: &EdgeCmd, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    match cmd {
        EdgeCmd::Add(args) => {
            let edge = Edge {
                id: args.id.clone(),
                source: args.source.clone(),
                target: args.target.clone(),
            };
            let event = commands::create_edge(&mut conn, &args.graph, edge)
                .with_context(|| format!("create edge '{}'", args.id))?;
            emit(mode, &event, |e| {
                format!("created edge '{}' ({})", args.id, e.id)
            })
        }
        EdgeCmd::Rm(args) => {
            let event = commands::delete_edge(&mut conn, &args.graph, &args.id)
                .with_context(|| format!("delete edge '{}'", args.id))?;
            emit(mode, &event, |e| {
                format!("deleted edge '{}' ({})", args.id, e.id)
            })
        }
        EdgeCmd::Check(args) => {
            let graph = graphs::get_graph(&conn, &args.graph)?;
            let report = CheckReport {
                source: args.source.clone(),
                target: args.target.clone(),
                allowed: graph.can_connect(&args.source, &args.target),
            };
            emit(mode, &report, |r| {
                format!(
                    "{} -> {}: {}",
                    r.source,
                    r.target,
                    if r.allowed { "allowed" } else { "rejected" }
                )
            })
        }
    }
}
