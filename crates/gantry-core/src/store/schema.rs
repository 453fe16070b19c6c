//! Canonical SQLite schema for the gantry store.
//!
//! Layout mirrors the normalized persisted form:
//! - `entities` keeps one document-like row per entity: fixed scalar columns
//!   plus the `data` and `collections` JSON documents. The row is the unit
//!   of transactional consistency for its ordered collections.
//! - `graphs` carries the graph's own data and `last_event_id`; nodes and
//!   edges live in their own tables and are written independently.
//! - `events` + `event_refs` form the append-only log with its fan-out
//!   filter; rows are never updated or deleted.

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS entities (
    entity_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('workspace', 'program', 'application', 'instruction', 'collection')),
    name TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    collections TEXT NOT NULL DEFAULT '{}',
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graphs (
    graph_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('workspace', 'program', 'application', 'instruction')),
    data TEXT NOT NULL DEFAULT '{}',
    last_event_id TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_nodes (
    graph_id TEXT NOT NULL REFERENCES graphs(graph_id) ON DELETE CASCADE,
    node_id TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('account', 'field', 'instruction', 'application', 'signer', 'collection', 'sysvar')),
    data TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (graph_id, node_id)
);

CREATE TABLE IF NOT EXISTS graph_edges (
    graph_id TEXT NOT NULL REFERENCES graphs(graph_id) ON DELETE CASCADE,
    edge_id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    PRIMARY KEY (graph_id, edge_id)
);

CREATE TABLE IF NOT EXISTS events (
    event_id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS event_refs (
    event_id TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    ref_id TEXT NOT NULL,
    PRIMARY KEY (event_id, ref_id)
);
";

/// Migration v2: read-path indexes for the watermark query.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_events_created
    ON events(created_at_us ASC);

CREATE INDEX IF NOT EXISTS idx_event_refs_ref
    ON event_refs(ref_id, event_id);

CREATE INDEX IF NOT EXISTS idx_graph_edges_target
    ON graph_edges(graph_id, target_id);

CREATE INDEX IF NOT EXISTS idx_entities_kind
    ON entities(kind, entity_id);
";
