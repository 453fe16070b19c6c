//! Domain model: entity documents, ordered child collections, and the
//! kind-discriminated node vocabulary shared by graphs and events.
//!
//! Everything stringly-typed at the wire boundary (entity kinds, collection
//! names, node kinds, field types) is decoded exactly once into the closed
//! enums defined here; downstream logic never touches raw strings.

pub mod entity;
pub mod node;

pub use entity::{CollectionName, EntityDoc, EntityKind, OrderedItem, UnknownCollection, UnknownEntityKind};
pub use node::{
    AccountData, ApplicationData, CollectionData, DecodeError, FieldData, FieldType,
    InstructionData, NodeData, NodeKind, SignerData, SysvarData, UnknownFieldType, UnknownNodeKind,
};
