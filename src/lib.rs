//! Turns an OpenStreetMap .osm document into typed map items (trees, roads,
//! buildings) for downstream rendering and training-data generation.
//!
//! Parsing streams tag events out of the XML and assembles nodes and ways
//! without building a document tree. Classification then runs every element
//! through the decoders of a [`etl::registry::Registry`].

pub mod config;
pub mod data;
pub mod errors;
pub mod etl;

pub use config::UserConfig;
