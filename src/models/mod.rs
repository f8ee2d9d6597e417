//! Core data models for the stats cache.

mod cache_entry;
mod ids;
mod match_record;
mod season;
mod stats;

pub use cache_entry::*;
pub use ids::*;
pub use match_record::*;
pub use season::*;
pub use stats::*;
