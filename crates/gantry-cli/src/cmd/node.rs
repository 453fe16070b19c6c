use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::collections::BTreeMap;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::commands;
use gantry_core::graph::Node;
use gantry_core::model::{NodeData, NodeKind};
use gantry_core::store;

#[derive(Subcommand, Debug)]
pub enum NodeCmd {
    #[command(about = "Add a node to a graph")]
    Add(AddArgs),
    #[command(about = "Shallow-update a node's payload")]
    Update(UpdateArgs),
    #[command(about = "Remove a node from a graph")]
    Rm(RmArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Node id.
    #[arg(long)]
    id: String,

    /// Node kind (account|field|instruction|application|signer|collection|sysvar).
    #[arg(long)]
    kind: String,

    /// Node payload as JSON, e.g. '{"name":"amount","type":"u64"}'.
    #[arg(long)]
    data: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Node id.
    #[arg(long)]
    id: String,

    /// The node's kind; must match what is stored.
    #[arg(long)]
    kind: String,

    /// Shallow change set as a JSON object.
    #[arg(long)]
    changes: String,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Graph id.
    #[arg(long)]
    graph: String,

    /// Node id.
    #[arg(long)]
    id: String,

    /// The node's kind; must match what is stored.
    #[arg(long)]
    kind: String,
}

fn parse_object(raw: &str) -> Result<BTreeMap<String, serde_json::Value>> {
    serde_json::from_str(raw).context("parse JSON object argument")
}

pub fn run(cmd: &NodeCmd, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    match cmd {
        NodeCmd::Add(args) => {
            let kind: NodeKind = args.kind.parse()?;
            let value: serde_json::Value =
                serde_json::from_str(&args.data).context("parse node payload")?;
            let data = NodeData::deserialize_for(kind, value)?;
            let event = commands::create_node(&mut conn, &args.graph, Node::new(&args.id, data))
                .with_context(|| format!("create node '{}'", args.id))?;
            emit(mode, &event, |e| {
                format!("created node '{}' ({})", args.id, e.id)
            })
        }
        NodeCmd::Update(args) => {
            let kind: NodeKind = args.kind.parse()?;
            let changes = parse_object(&args.changes)?;
            let event = commands::update_node(&mut conn, &args.graph, &args.id, kind, changes)
                .with_context(|| format!("update node '{}'", args.id))?;
            emit(mode, &event, |e| {
                format!("updated node '{}' ({})", args.id, e.id)
            })
        }
        NodeCmd::Rm(args) => {
            let kind: NodeKind = args.kind.parse()?;
            let event = commands::delete_node(&mut conn, &args.graph, &args.id, kind)
                .with_context(|| format!("delete node '{}'", args.id))?;
            emit(mode, &event, |e| {
                format!("deleted node '{}' ({})", args.id, e.id)
            })
        }
    }
}
