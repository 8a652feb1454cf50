//! Domain layer for the Caissa coaching engine
//!
//! This module contains the coaching taxonomy, domain models and the ports
//! that persistence adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
