//! Metadata about the remote data store: the pre-built index of entities and fields,
//! entity naming rules, and fuzzy selection of candidate entities.

pub mod metadata;
