//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - AnalysisSource: read access to the upstream analysis store
//! - ProfileStore: per-user plans, habit state, audits and reflections
//!
//! These traits keep the coaching engine independent of any specific
//! storage implementation.

pub mod analysis_source;
pub mod profile_store;

pub use analysis_source::AnalysisSource;
pub use profile_store::ProfileStore;
