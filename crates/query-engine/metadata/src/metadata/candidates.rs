//! Pick the entities a free-text request most likely refers to.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::entity::split_entity;
use super::index::{IndexEntry, MetadataIndex};
use super::similarity::{self, Similarity};

/// The default number of candidates handed to plan generation.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

/// The score given to an entity the user named explicitly.
pub const EXPLICIT_ENTITY_SCORE: u8 = 100;

/// A metadata entry scored against a request as a possible target entity.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub entity: String,
    pub name: String,
    pub synonym: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub score: u8,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub field_types: BTreeMap<String, String>,
}

impl Candidate {
    pub fn from_entry(entry: &IndexEntry, score: u8) -> Self {
        Candidate {
            entity: entry.entity(),
            name: entry.name.clone(),
            synonym: entry.synonym.clone(),
            r#type: entry.r#type.clone(),
            score,
            fields: entry.fields.clone(),
            field_types: entry.field_types.clone(),
        }
    }

    /// A candidate known only by its entity set name, with no field information.
    pub fn from_entity_name(entity: &str, score: u8) -> Self {
        let (r#type, name) = split_entity(entity).unwrap_or(("", entity));
        Candidate {
            entity: entity.to_string(),
            name: name.to_string(),
            synonym: name.to_string(),
            r#type: r#type.to_string(),
            score,
            fields: vec![],
            field_types: BTreeMap::new(),
        }
    }
}

/// Rank the index against `query` and keep the best `limit` entries.
///
/// Entries without search text are never candidates.
pub fn choose_candidates<S>(
    index: &MetadataIndex,
    similarity: &S,
    query: &str,
    limit: usize,
) -> Vec<Candidate>
where
    S: Similarity + ?Sized,
{
    if index.is_empty() {
        return vec![];
    }

    let searchable: Vec<&IndexEntry> = index
        .entries()
        .filter(|entry| !entry.search_text.is_empty())
        .collect();

    similarity::extract(
        similarity,
        query,
        searchable.iter().map(|entry| entry.search_text.as_str()),
        limit,
    )
    .into_iter()
    .map(|(position, score)| Candidate::from_entry(searchable[position], score))
    .collect()
}

/// Put an explicitly named entity at the front of the candidate list with the maximal
/// score. An already ranked candidate for the same entity is moved rather than duplicated,
/// keeping its field information.
///
/// The entity is not checked against the metadata here; plan validation does that later.
pub fn prepend_explicit_entity(candidates: &mut Vec<Candidate>, entity: &str) {
    let existing = candidates
        .iter()
        .position(|candidate| candidate.entity.eq_ignore_ascii_case(entity));
    let mut explicit = match existing {
        Some(position) => candidates.remove(position),
        None => Candidate::from_entity_name(entity, EXPLICIT_ENTITY_SCORE),
    };
    explicit.score = EXPLICIT_ENTITY_SCORE;
    candidates.insert(0, explicit);
}
