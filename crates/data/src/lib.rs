//! File adapters for markovrec: delimited interaction, item and purchase
//! tables in, recommendation JSON and evaluation TSV out.
//!
//! Paths ending in `.gz` are transparently gzip-decoded or encoded. Outputs
//! are never overwritten.

pub mod delimited;
pub mod errors;
pub mod evaluations;
pub mod files;
pub mod interactions;
pub mod items;
pub mod purchases;
pub mod recommendations;

pub use delimited::{sniff_delimiter, DelimitedReader};
pub use errors::DataError;
pub use evaluations::write_evaluations;
pub use files::{ensure_absent, ensure_exists};
pub use interactions::load_interactions;
pub use items::load_item_vocabulary;
pub use purchases::load_purchases;
pub use recommendations::{read_recommendations, write_recommendations, RecommendationLayout};
