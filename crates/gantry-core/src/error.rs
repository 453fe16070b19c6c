use crate::model::{CollectionName, DecodeError};
use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    EntityNotFound,
    ItemNotFound,
    GraphNotFound,
    NodeNotFound,
    EdgeNotFound,
    EventNotFound,
    AlreadyExists,
    InvalidPermutation,
    KindMismatch,
    ConnectionRejected,
    WatermarkInvalid,
    TransactionAborted,
    CorruptDocument,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::EntityNotFound => "E2001",
            Self::ItemNotFound => "E2002",
            Self::GraphNotFound => "E2003",
            Self::NodeNotFound => "E2004",
            Self::EdgeNotFound => "E2005",
            Self::EventNotFound => "E2006",
            Self::AlreadyExists => "E3001",
            Self::InvalidPermutation => "E3002",
            Self::KindMismatch => "E3003",
            Self::ConnectionRejected => "E3004",
            Self::WatermarkInvalid => "E4001",
            Self::TransactionAborted => "E5001",
            Self::CorruptDocument => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::EntityNotFound => "Entity not found",
            Self::ItemNotFound => "Collection item not found",
            Self::GraphNotFound => "Graph not found",
            Self::NodeNotFound => "Node not found",
            Self::EdgeNotFound => "Edge not found",
            Self::EventNotFound => "Event not found",
            Self::AlreadyExists => "Id already exists",
            Self::InvalidPermutation => "New order is not a permutation",
            Self::KindMismatch => "Node kind mismatch",
            Self::ConnectionRejected => "Connection not allowed",
            Self::WatermarkInvalid => "Watermark event unreadable",
            Self::TransactionAborted => "Store transaction aborted",
            Self::CorruptDocument => "Corrupt stored document",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `gantry init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in gantry.toml and retry."),
            Self::EntityNotFound
            | Self::GraphNotFound
            | Self::NodeNotFound
            | Self::EdgeNotFound
            | Self::EventNotFound => None,
            Self::ItemNotFound => {
                Some("The item may have been transferred concurrently; retry against fresh state.")
            }
            Self::AlreadyExists => Some("Use a different id or delete the existing record first."),
            Self::InvalidPermutation => {
                Some("Recompute the order from the owner's current collection and retry.")
            }
            Self::KindMismatch => Some("Reload the graph; the node changed kind or was replaced."),
            Self::ConnectionRejected => None,
            Self::WatermarkInvalid => Some("Reload the full graph instead of catching up."),
            Self::TransactionAborted => Some("Retry after the competing writer commits."),
            Self::CorruptDocument => Some("Inspect the stored JSON for manual repair."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The typed failure taxonomy of the synchronization core.
///
/// Every operation that can fail returns one of these; none is used for
/// control flow elsewhere. After any failure the persisted state is exactly
/// as it was before the attempted operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("id '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("entity '{id}' not found")]
    EntityNotFound { id: String },

    #[error("item '{item_id}' not found in '{owner_id}'.{collection}")]
    ItemNotFound {
        owner_id: String,
        collection: CollectionName,
        item_id: String,
    },

    #[error("graph '{id}' not found")]
    GraphNotFound { id: String },

    #[error("node '{id}' not found")]
    NodeNotFound { id: String },

    #[error("edge '{id}' not found")]
    EdgeNotFound { id: String },

    #[error("event '{id}' not found")]
    EventNotFound { id: String },

    #[error("new order for '{owner_id}'.{collection} is not a permutation: {reason}")]
    InvalidPermutation {
        owner_id: String,
        collection: CollectionName,
        reason: String,
    },

    #[error("kind mismatch for node '{id}': expected {expected}, stored {stored}")]
    KindMismatch {
        id: String,
        expected: String,
        stored: String,
    },

    #[error("edge {from} -> {target} rejected by the graph's connection rules")]
    ConnectionRejected { from: String, target: String },

    #[error("watermark event '{id}' is unreadable; fall back to a full reload")]
    WatermarkInvalid { id: String },

    #[error("store transaction aborted: {0}")]
    TransactionAborted(#[from] rusqlite::Error),

    #[error("corrupt document '{id}': {reason}")]
    CorruptDocument { id: String, reason: String },
}

impl CoreError {
    /// The stable machine code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::EntityNotFound { .. } => ErrorCode::EntityNotFound,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::GraphNotFound { .. } => ErrorCode::GraphNotFound,
            Self::NodeNotFound { .. } => ErrorCode::NodeNotFound,
            Self::EdgeNotFound { .. } => ErrorCode::EdgeNotFound,
            Self::EventNotFound { .. } => ErrorCode::EventNotFound,
            Self::InvalidPermutation { .. } => ErrorCode::InvalidPermutation,
            Self::KindMismatch { .. } => ErrorCode::KindMismatch,
            Self::ConnectionRejected { .. } => ErrorCode::ConnectionRejected,
            Self::WatermarkInvalid { .. } => ErrorCode::WatermarkInvalid,
            Self::TransactionAborted(_) => ErrorCode::TransactionAborted,
            Self::CorruptDocument { .. } => ErrorCode::CorruptDocument,
        }
    }

    /// Build a [`CorruptDocument`](Self::CorruptDocument) failure from a
    /// payload decode error.
    #[must_use]
    pub fn corrupt(id: impl Into<String>, err: &DecodeError) -> Self {
        Self::CorruptDocument {
            id: id.into(),
            reason: err.to_string(),
        }
    }
}

/// Result alias used across the core.
pub type Result<T> = std::result::Result<T, CoreError>;
