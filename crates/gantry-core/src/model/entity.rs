//! Entity documents and their named ordered collections.
//!
//! An entity is a single document-like record: scalar fields plus zero or
//! more named ordered collections of items. The entity is the unit of
//! transactional consistency — every read and write of its collections goes
//! against this one record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The five entity kinds in the domain hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Workspace,
    Program,
    Application,
    Instruction,
    Collection,
}

impl EntityKind {
    /// All entity kinds, in hierarchy order.
    pub const ALL: [Self; 5] = [
        Self::Workspace,
        Self::Program,
        Self::Application,
        Self::Instruction,
        Self::Collection,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Program => "program",
            Self::Application => "application",
            Self::Instruction => "instruction",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entity kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{raw}'")]
pub struct UnknownEntityKind {
    pub raw: String,
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspace" => Ok(Self::Workspace),
            "program" => Ok(Self::Program),
            "application" => Ok(Self::Application),
            "instruction" => Ok(Self::Instruction),
            "collection" => Ok(Self::Collection),
            _ => Err(UnknownEntityKind { raw: s.to_string() }),
        }
    }
}

/// The closed set of named ordered collections an entity may own.
///
/// Within one named collection on one owner, item ids are unique and order
/// is significant. An item belongs to exactly one owner at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
    Tasks,
    Signers,
    Sysvars,
    Documents,
    Applications,
    Arguments,
}

impl CollectionName {
    /// All collection names in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Tasks,
        Self::Signers,
        Self::Sysvars,
        Self::Documents,
        Self::Applications,
        Self::Arguments,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Signers => "signers",
            Self::Sysvars => "sysvars",
            Self::Documents => "documents",
            Self::Applications => "applications",
            Self::Arguments => "arguments",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown collection name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection '{raw}': expected one of tasks, signers, sysvars, documents, applications, arguments")]
pub struct UnknownCollection {
    pub raw: String,
}

impl FromStr for CollectionName {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(Self::Tasks),
            "signers" => Ok(Self::Signers),
            "sysvars" => Ok(Self::Sysvars),
            "documents" => Ok(Self::Documents),
            "applications" => Ok(Self::Applications),
            "arguments" => Ok(Self::Arguments),
            _ => Err(UnknownCollection { raw: s.to_string() }),
        }
    }
}

/// A member of one of an entity's named ordered collections.
///
/// The payload is open: whatever scalar fields the item carries beyond its
/// id are preserved verbatim through reorder and transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub id: String,

    #[serde(flatten)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl OrderedItem {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }
}

/// A decoded entity document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDoc {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,

    /// Scalar fields beyond the fixed columns.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,

    /// Named ordered collections. Absent names read as empty.
    #[serde(default)]
    pub collections: BTreeMap<CollectionName, Vec<OrderedItem>>,
}

impl EntityDoc {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            data: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    /// The items of a named collection, empty when the name is absent.
    #[must_use]
    pub fn collection(&self, name: CollectionName) -> &[OrderedItem] {
        self.collections.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Replace a named collection wholesale. An empty replacement removes
    /// the name from the document rather than storing an empty array.
    pub fn set_collection(&mut self, name: CollectionName, items: Vec<OrderedItem>) {
        if items.is_empty() {
            self.collections.remove(&name);
        } else {
            self.collections.insert(name, items);
        }
    }

    /// Ids of a named collection, in order.
    #[must_use]
    pub fn collection_ids(&self, name: CollectionName) -> Vec<&str> {
        self.collection(name).iter().map(|i| i.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_kind_roundtrip() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().expect("should parse");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn entity_kind_rejects_unknown() {
        let err = "module".parse::<EntityKind>().unwrap_err();
        assert_eq!(err.raw, "module");
    }

    #[test]
    fn collection_name_roundtrip() {
        for name in CollectionName::ALL {
            let parsed: CollectionName = name.as_str().parse().expect("should parse");
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn collection_name_rejects_unknown() {
        let err = "widgets".parse::<CollectionName>().unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn ordered_item_flattens_attrs() {
        let item = OrderedItem::new("t1").with_attr("name", json!("compute"));
        let encoded = serde_json::to_value(&item).expect("serialize");
        assert_eq!(encoded, json!({"id": "t1", "name": "compute"}));

        let decoded: OrderedItem = serde_json::from_value(encoded).expect("deserialize");
        assert_eq!(decoded, item);
    }

    #[test]
    fn missing_collection_reads_empty() {
        let doc = EntityDoc::new("i1", EntityKind::Instruction, "transfer");
        assert!(doc.collection(CollectionName::Tasks).is_empty());
    }

    #[test]
    fn set_collection_drops_empty_arrays() {
        let mut doc = EntityDoc::new("i1", EntityKind::Instruction, "transfer");
        doc.set_collection(CollectionName::Signers, vec![OrderedItem::new("s1")]);
        assert_eq!(doc.collection_ids(CollectionName::Signers), vec!["s1"]);

        doc.set_collection(CollectionName::Signers, vec![]);
        assert!(!doc.collections.contains_key(&CollectionName::Signers));
    }

    #[test]
    fn collections_serialize_under_wire_names() {
        let mut doc = EntityDoc::new("i1", EntityKind::Instruction, "transfer");
        doc.set_collection(CollectionName::Tasks, vec![OrderedItem::new("t1")]);
        let encoded = serde_json::to_value(&doc).expect("serialize");
        assert!(encoded["collections"]["tasks"].is_array());
    }
}
