#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputMode;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gantry_core::config::CoreConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gantry: synchronization core for typed program-definition graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override the store path from gantry.toml.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create (or migrate) the store database")]
    Init(cmd::init::InitArgs),

    #[command(subcommand, about = "Entity document operations")]
    Entity(cmd::entity::EntityCmd),

    #[command(about = "Rewrite an owner's ordered collection to a new permutation")]
    Reorder(cmd::collections::ReorderArgs),

    #[command(about = "Move an item between two owners' same-named collections")]
    Transfer(cmd::collections::TransferArgs),

    #[command(subcommand, about = "Graph operations")]
    Graph(cmd::graph::GraphCmd),

    #[command(subcommand, about = "Node operations on a graph")]
    Node(cmd::node::NodeCmd),

    #[command(subcommand, about = "Edge operations on a graph")]
    Edge(cmd::edge::EdgeCmd),

    #[command(about = "List the most recent events for a reference id")]
    Events(cmd::events::EventsArgs),

    #[command(about = "Run one watermark catch-up step for a graph")]
    Sync(cmd::sync::SyncArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = CoreConfig::load(std::path::Path::new("gantry.toml"))?;
    let db_path = cli.db.clone().unwrap_or(config.store.path.clone());
    let mode = cli.output_mode();

    match &cli.command {
        Commands::Init(args) => cmd::init::run(args, &db_path, mode),
        Commands::Entity(sub) => cmd::entity::run(sub, &db_path, mode),
        Commands::Reorder(args) => cmd::collections::run_reorder(args, &db_path, mode),
        Commands::Transfer(args) => cmd::collections::run_transfer(args, &db_path, mode),
        Commands::Graph(sub) => cmd::graph::run(sub, &db_path, mode),
        Commands::Node(sub) => cmd::node::run(sub, &db_path, mode),
        Commands::Edge(sub) => cmd::edge::run(sub, &db_path, mode),
        Commands::Events(args) => cmd::events::run(args, &db_path, mode),
        Commands::Sync(args) => cmd::sync::run(args, &db_path, mode),
    }
}
