use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::model::CollectionName;
use gantry_core::store::{self, collections, entities};

#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Owner entity id.
    #[arg(long)]
    owner: String,

    /// Collection name (tasks|signers|sysvars|documents|applications|arguments).
    #[arg(long)]
    collection: String,

    /// The new id order, comma-separated. Must be a permutation of the
    /// collection's current ids.
    #[arg(long, value_delimiter = ',')]
    order: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Source owner entity id.
    #[arg(long)]
    from: String,

    /// Destination owner entity id.
    #[arg(long)]
    to: String,

    /// Collection name on both owners.
    #[arg(long)]
    collection: String,

    /// Id of the item to move.
    #[arg(long)]
    item: String,

    /// Destination index (clamped to the destination length).
    #[arg(long, default_value_t = 0)]
    index: usize,
}

#[derive(Serialize)]
struct TransferReport {
    from: Vec<String>,
    to: Vec<String>,
    landed: usize,
}

pub fn run_reorder(args: &ReorderArgs, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    let collection: CollectionName = args.collection.parse()?;

    collections::reorder(&mut conn, &args.owner, collection, &args.order)
        .with_context(|| format!("reorder '{}'.{}", args.owner, collection))?;

    let doc = entities::get_entity(&conn, &args.owner)?;
    let ids: Vec<String> = doc
        .collection_ids(collection)
        .into_iter()
        .map(str::to_string)
        .collect();
    emit(mode, &ids, |ids| {
        format!("{}.{collection} = [{}]", args.owner, ids.join(", "))
    })
}

pub fn run_transfer(args: &TransferArgs, db_path: &Path, mode: OutputMode) -> Result<()> {
    let mut conn = store::open_store(db_path)?;
    let collection: CollectionName = args.collection.parse()?;

    let landed = collections::transfer(
        &mut conn,
        &args.from,
        &args.to,
        collection,
        &args.item,
        args.index,
    )
    .with_context(|| {
        format!(
            "transfer '{}' from '{}' to '{}'",
            args.item, args.from, args.to
        )
    })?;

    let from_ids = entities::get_entity(&conn, &args.from)?
        .collection_ids(collection)
        .into_iter()
        .map(str::to_string)
        .collect();
    let to_ids = entities::get_entity(&conn, &args.to)?
        .collection_ids(collection)
        .into_iter()
        .map(str::to_string)
        .collect();

    let report = TransferReport {
        from: from_ids,
        to: to_ids,
        landed,
    };
    emit(mode, &report, |r| {
        format!(
            "moved '{}' to index {}\n{}.{collection} = [{}]\n{}.{collection} = [{}]",
            args.item,
            r.landed,
            args.from,
            r.from.join(", "),
            args.to,
            r.to.join(", ")
        )
    })
}
