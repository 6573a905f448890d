//! Parsed documents, their readability, and the per-job collection they accumulate into.

pub mod collection;
pub mod model;
pub mod readability;

pub use collection::{ConstructionStats, DocumentCollection};
pub use model::{Construction, Document};
pub use readability::{Readability, ReadabilityLevel, TextStats};
