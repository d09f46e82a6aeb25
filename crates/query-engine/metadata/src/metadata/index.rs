//! The searchable metadata index produced by the schema dump.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One object of the source system's schema, with its fields and the precomputed
/// lowercase text used for fuzzy search.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub synonym: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub field_types: BTreeMap<String, String>,
    #[serde(default)]
    pub search_text: String,
}

impl IndexEntry {
    /// The entity set name this object is exposed under.
    pub fn entity(&self) -> String {
        format!("{}_{}", self.r#type, self.name)
    }
}

/// The complete metadata index. Read-only once loaded.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MetadataIndex(pub Vec<IndexEntry>);

impl MetadataIndex {
    pub fn empty() -> Self {
        MetadataIndex(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.0.iter()
    }

    /// Every entity name known to the index.
    pub fn entities(&self) -> BTreeSet<String> {
        self.0.iter().map(IndexEntry::entity).collect()
    }

    /// Known field names per entity. Entities whose metadata lists no fields map to an
    /// empty set.
    pub fn fields_by_entity(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in &self.0 {
            index
                .entry(entry.entity())
                .or_default()
                .extend(entry.fields.iter().cloned());
        }
        index
    }

    /// Find the entry exposed under `entity`.
    pub fn find_entity(&self, entity: &str) -> Option<&IndexEntry> {
        self.0.iter().find(|entry| entry.entity() == entity)
    }
}

impl From<Vec<IndexEntry>> for MetadataIndex {
    fn from(entries: Vec<IndexEntry>) -> Self {
        MetadataIndex(entries)
    }
}
