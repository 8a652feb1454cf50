//! Infrastructure adapters for the analysis source and the profile store.

pub mod memory;
pub mod sqlite;
