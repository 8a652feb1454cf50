//! In-memory adapters, used by tests and embedding callers that bring their
//! own persistence.

pub mod analysis_source;
pub mod profile_store;

pub use analysis_source::InMemoryAnalysisSource;
pub use profile_store::InMemoryProfileStore;
