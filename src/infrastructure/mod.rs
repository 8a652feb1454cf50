//! Infrastructure layer module
//!
//! Configuration loading (figment) and logging setup (tracing). Storage
//! adapters live under `crate::adapters`.

pub mod config;
pub mod logging;
