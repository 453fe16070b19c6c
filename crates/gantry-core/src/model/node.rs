//! Node kinds and their typed payloads.
//!
//! A node's `data` shape is determined by its `kind` — a tagged union with
//! the tag held outside the payload (in the node/event envelope), so decoding
//! goes through [`NodeData::deserialize_for`] rather than a serde-internal
//! tag. Unknown payload fields are preserved via `#[serde(flatten)]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every node kind across all graph kinds.
///
/// Program and application graphs use `account | field | instruction`
/// (applications additionally place `collection` nodes); instruction graphs
/// use `application | signer | collection | sysvar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Account,
    Field,
    Instruction,
    Application,
    Signer,
    Collection,
    Sysvar,
}

impl NodeKind {
    /// All node kinds in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Account,
        Self::Field,
        Self::Instruction,
        Self::Application,
        Self::Signer,
        Self::Collection,
        Self::Sysvar,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Field => "field",
            Self::Instruction => "instruction",
            Self::Application => "application",
            Self::Signer => "signer",
            Self::Collection => "collection",
            Self::Sysvar => "sysvar",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown node kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node kind '{raw}'")]
pub struct UnknownNodeKind {
    pub raw: String,
}

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(Self::Account),
            "field" => Ok(Self::Field),
            "instruction" => Ok(Self::Instruction),
            "application" => Ok(Self::Application),
            "signer" => Ok(Self::Signer),
            "collection" => Ok(Self::Collection),
            "sysvar" => Ok(Self::Sysvar),
            _ => Err(UnknownNodeKind { raw: s.to_string() }),
        }
    }
}

/// Field value types. `struct` is the one composite: only struct-typed
/// fields may nest other fields under the connection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I64,
    String,
    Pubkey,
    Struct,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::String => "string",
            Self::Pubkey => "pubkey",
            Self::Struct => "struct",
        }
    }

    /// Whether fields of this type may own nested fields.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::Struct)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown field type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type '{raw}'")]
pub struct UnknownFieldType {
    pub raw: String,
}

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "u8" => Ok(Self::U8),
            "u16" => Ok(Self::U16),
            "u32" => Ok(Self::U32),
            "u64" => Ok(Self::U64),
            "i64" => Ok(Self::I64),
            "string" => Ok(Self::String),
            "pubkey" => Ok(Self::Pubkey),
            "struct" => Ok(Self::Struct),
            _ => Err(UnknownFieldType { raw: s.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-kind payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionData {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerData {
    pub name: String,
    /// Whether the signer's account is written back after the instruction.
    #[serde(default)]
    pub save_changes: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionData {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysvarData {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// NodeData — the unified payload enum
// ---------------------------------------------------------------------------

/// Error produced when a node payload does not match its declared kind.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} payload: {source}")]
pub struct DecodeError {
    pub kind: NodeKind,
    #[source]
    pub source: serde_json::Error,
}

/// Typed node payload. The discriminant is the node's [`NodeKind`], held in
/// the surrounding envelope, so this enum serializes as the bare payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Account(AccountData),
    Field(FieldData),
    Instruction(InstructionData),
    Application(ApplicationData),
    Signer(SignerData),
    Collection(CollectionData),
    Sysvar(SysvarData),
}

impl NodeData {
    /// The kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Account(_) => NodeKind::Account,
            Self::Field(_) => NodeKind::Field,
            Self::Instruction(_) => NodeKind::Instruction,
            Self::Application(_) => NodeKind::Application,
            Self::Signer(_) => NodeKind::Signer,
            Self::Collection(_) => NodeKind::Collection,
            Self::Sysvar(_) => NodeKind::Sysvar,
        }
    }

    /// Decode a payload value against a known kind.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the value does not satisfy the kind's
    /// payload schema.
    pub fn deserialize_for(
        kind: NodeKind,
        value: serde_json::Value,
    ) -> Result<Self, DecodeError> {
        let result = match kind {
            NodeKind::Account => serde_json::from_value(value).map(Self::Account),
            NodeKind::Field => serde_json::from_value(value).map(Self::Field),
            NodeKind::Instruction => serde_json::from_value(value).map(Self::Instruction),
            NodeKind::Application => serde_json::from_value(value).map(Self::Application),
            NodeKind::Signer => serde_json::from_value(value).map(Self::Signer),
            NodeKind::Collection => serde_json::from_value(value).map(Self::Collection),
            NodeKind::Sysvar => serde_json::from_value(value).map(Self::Sysvar),
        };
        result.map_err(|source| DecodeError { kind, source })
    }

    /// Serialize the payload to a [`serde_json::Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if the inner struct fails to serialize.
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Account(d) => serde_json::to_value(d),
            Self::Field(d) => serde_json::to_value(d),
            Self::Instruction(d) => serde_json::to_value(d),
            Self::Application(d) => serde_json::to_value(d),
            Self::Signer(d) => serde_json::to_value(d),
            Self::Collection(d) => serde_json::to_value(d),
            Self::Sysvar(d) => serde_json::to_value(d),
        }
    }

    /// Shallow-merge a partial change set into this payload, keeping the
    /// kind fixed. Keys present in `changes` replace the current values;
    /// everything else is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the merged object no longer satisfies
    /// the kind's payload schema (e.g. a malformed `type` on a field).
    pub fn merged(
        &self,
        changes: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, DecodeError> {
        let kind = self.kind();
        let mut value = self.to_json_value().map_err(|source| DecodeError { kind, source })?;
        if let serde_json::Value::Object(map) = &mut value {
            for (key, change) in changes {
                map.insert(key.clone(), change.clone());
            }
        }
        Self::deserialize_for(kind, value)
    }
}

impl Serialize for NodeData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Account(d) => d.serialize(serializer),
            Self::Field(d) => d.serialize(serializer),
            Self::Instruction(d) => d.serialize(serializer),
            Self::Application(d) => d.serialize(serializer),
            Self::Signer(d) => d.serialize(serializer),
            Self::Collection(d) => d.serialize(serializer),
            Self::Sysvar(d) => d.serialize(serializer),
        }
    }
}
