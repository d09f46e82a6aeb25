//! The entity naming convention of the remote data store.
//!
//! Every entity set is named `Prefix_Name`, where the prefix is one of a fixed set of
//! object kinds.

use std::sync::OnceLock;

use enum_iterator::Sequence;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The kinds of objects the query engine can read from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize, JsonSchema,
)]
pub enum EntityPrefix {
    Catalog,
    Document,
    InformationRegister,
    AccumulationRegister,
    ChartOfAccounts,
}

impl EntityPrefix {
    /// The prefix as it appears in entity set names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Catalog => "Catalog",
            Self::Document => "Document",
            Self::InformationRegister => "InformationRegister",
            Self::AccumulationRegister => "AccumulationRegister",
            Self::ChartOfAccounts => "ChartOfAccounts",
        }
    }

    /// The object kind as named by the source system's navigation links.
    pub fn localized_name(&self) -> &'static str {
        match self {
            Self::Catalog => "Справочник",
            Self::Document => "Документ",
            Self::InformationRegister => "РегистрСведений",
            Self::AccumulationRegister => "РегистрНакопления",
            Self::ChartOfAccounts => "ПланСчетов",
        }
    }

    /// All known prefixes, in declaration order.
    pub fn all() -> impl Iterator<Item = EntityPrefix> {
        enum_iterator::all::<EntityPrefix>()
    }

    /// Look up a prefix by its exact name.
    pub fn from_name(name: &str) -> Option<EntityPrefix> {
        Self::all().find(|prefix| prefix.name() == name)
    }

    /// Match the start of `entity` against the known prefixes, ignoring case.
    /// Returns the prefix and whatever follows it.
    pub fn strip_from(entity: &str) -> Option<(EntityPrefix, &str)> {
        Self::all().find_map(|prefix| {
            let len = prefix.name().len();
            match entity.get(..len) {
                Some(head) if head.eq_ignore_ascii_case(prefix.name()) => {
                    Some((prefix, &entity[len..]))
                }
                _ => None,
            }
        })
    }
}

impl std::fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(Catalog|Document|InformationRegister|AccumulationRegister|ChartOfAccounts)_\w+$",
        )
        .expect("entity pattern is a valid regex")
    })
}

fn explicit_entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?P<prefix>Catalog|Document|InformationRegister|AccumulationRegister|ChartOfAccounts)_(?P<name>\w+)\b",
        )
        .expect("explicit entity pattern is a valid regex")
    })
}

/// Whether `entity` follows the `Prefix_Name` convention exactly.
pub fn is_valid_entity_name(entity: &str) -> bool {
    entity_pattern().is_match(entity)
}

/// Split an entity name into its prefix part and object name at the first underscore.
pub fn split_entity(entity: &str) -> Option<(&str, &str)> {
    entity.split_once('_')
}

/// Find an explicit `Prefix_Name` reference in free text. The prefix is returned in its
/// canonical casing.
pub fn extract_explicit_entity(text: &str) -> Option<String> {
    let captures = explicit_entity_pattern().captures(text)?;
    let (prefix, _) = EntityPrefix::strip_from(captures.name("prefix")?.as_str())?;
    Some(format!("{}_{}", prefix.name(), captures.name("name")?.as_str()))
}
