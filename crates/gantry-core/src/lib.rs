//! gantry-core: the synchronization core behind the gantry editor.
//!
//! The crate keeps a typed, polymorphic graph of program-definition
//! entities consistent across an optimistic local cache and a durable
//! SQLite store:
//!
//! - [`store`] owns the entity documents, graphs, and the append-only
//!   event log; [`store::collections`] is the atomic reorder/transfer
//!   engine over the entities' ordered child collections.
//! - [`graph`] is the kind-discriminated node/edge model with per-domain
//!   connection rules.
//! - [`commands`] applies a mutation and appends its success event in one
//!   transaction.
//! - [`sync`] walks the event log one event at a time per graph, addressed
//!   by the graph's persisted watermark.
//! - [`projection`] is the client-side read model fed by optimistic local
//!   writes and watermark-delivered remote events.
//!
//! # Conventions
//!
//! - **Errors**: operations return [`error::CoreError`]; setup paths
//!   (open/migrate/config) use `anyhow::Result` with context.
//! - **Logging**: `tracing` macros (`debug!`, `warn!`) — never `println!`.

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod model;
pub mod projection;
pub mod store;
pub mod sync;

pub use error::{CoreError, ErrorCode, Result};
