use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::model::{EntityDoc, EntityKind};
use gantry_core::store::{self, entities};

#[derive(Subcommand, Debug)]
pub enum EntityCmd {
    #[command(about = "Create an entity document")]
    Create(CreateArgs),
    #[command(about = "Show an entity document")]
    Show(ShowArgs),
    #[command(about = "List entity ids")]
    List(ListArgs),
    #[command(about = "Delete an entity document")]
    Delete(ShowArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Entity id.
    #[arg(long)]
    id: String,

    /// Entity kind (workspace|program|application|instruction|collection).
    #[arg(long)]
    kind: String,

    /// Display name.
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Entity id.
    #[arg(long)]
    id: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Restrict to one entity kind.
    #[arg(long)]
    kind: Option<String>,
}

pub fn run(cmd: &EntityCmd, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    match cmd {
        EntityCmd::Create(args) => {
            let kind: EntityKind = args.kind.parse()?;
            let doc = EntityDoc::new(&args.id, kind, &args.name);
            entities::create_entity(&mut conn, &doc)
                .with_context(|| format!("create entity '{}'", args.id))?;
            emit(mode, &doc, |d| format!("created {} '{}'", d.kind, d.id))
        }
        EntityCmd::Show(args) => {
            let doc = entities::get_entity(&conn, &args.id)?;
            emit(mode, &doc, |d| {
                let mut out = format!("{} '{}' ({})", d.kind, d.id, d.name);
                for (name, items) in &d.collections {
                    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
                    out.push_str(&format!("\n  {name}: [{}]", ids.join(", ")));
                }
                out
            })
        }
        EntityCmd::List(args) => {
            let kind = args.kind.as_deref().map(str::parse).transpose()?;
            let ids = entities::list_entity_ids(&conn, kind)?;
            emit(mode, &ids, |ids| ids.join("\n"))
        }
        EntityCmd::Delete(args) => {
            entities::delete_entity(&conn, &args.id)
                .with_context(|| format!("delete entity '{}'", args.id))?;
            emit(mode, &args.id, |id| format!("deleted '{id}'"))
        }
    }
}
