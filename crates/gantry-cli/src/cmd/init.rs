use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, emit};
use gantry_core::store;

#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Serialize)]
struct InitReport {
    path: String,
    schema_version: u32,
}

/// Execute `gantry init`: create (or migrate) the store database.
pub fn run(_args: &InitArgs, db_path: &Path, mode: OutputMode) -> Result<()> {
    let conn = store::open_store(db_path)?;
    let schema_version = store::migrations::current_schema_version(&conn)?;

    let report = InitReport {
        path: db_path.display().to_string(),
        schema_version,
    };
    emit(mode, &report, |r| {
        format!("store ready at {} (schema v{})", r.path, r.schema_version)
    })
}
