//! Metadata information regarding the remote data store and the entities it exposes.

pub mod candidates;
pub mod entity;
pub mod index;
pub mod similarity;

// re-export without modules
pub use candidates::*;
pub use entity::*;
pub use index::*;
pub use similarity::{Similarity, WeightedRatio};
