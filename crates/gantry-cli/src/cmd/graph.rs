use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::graph::{Graph, GraphKind};
use gantry_core::store::{self, graphs};

#[derive(Subcommand, Debug)]
pub enum GraphCmd {
    #[command(about = "Create an empty graph")]
    Create(CreateArgs),
    #[command(about = "Show a graph with its nodes and edges")]
    Show(ShowArgs),
    #[command(about = "Delete a graph (nodes and edges cascade)")]
    Delete(ShowArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Graph id.
    #[arg(long)]
    id: String,

    /// Graph kind (workspace|program|application|instruction).
    #[arg(long)]
    kind: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Graph id.
    #[arg(long)]
    id: String,
}

pub fn run(cmd: &GraphCmd, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    match cmd {
        GraphCmd::Create(args) => {
            let kind: GraphKind = args.kind.parse()?;
            let graph = Graph::new(&args.id, kind);
            graphs::create_graph(&mut conn, &graph)
                .with_context(|| format!("create graph '{}'", args.id))?;
            emit(mode, &graph, |g| format!("created {} graph '{}'", g.kind, g.id))
        }
        GraphCmd::Show(args) => {
            let graph = graphs::get_graph(&conn, &args.id)?;
            emit(mode, &graph, |g| {
                let mut out = format!(
                    "{} graph '{}' — {} nodes, {} edges",
                    g.kind,
                    g.id,
                    g.nodes.len(),
                    g.edges.len()
                );
                for node in &g.nodes {
                    out.push_str(&format!("\n  node {} ({})", node.id, node.kind));
                }
                for edge in &g.edges {
                    out.push_str(&format!(
                        "\n  edge {}: {} -> {}",
                        edge.id, edge.source, edge.target
                    ));
                }
                if let Some(wm) = &g.last_event_id {
                    out.push_str(&format!("\n  watermark {wm}"));
                }
                out
            })
        }
        GraphCmd::Delete(args) => {
            let event = gantry_core::commands::delete_graph(&mut conn, &args.id)
                .with_context(|| format!("delete graph '{}'", args.id))?;
            emit(mode, &event, |e| format!("deleted graph '{}' ({})", args.id, e.id))
        }
    }
}
