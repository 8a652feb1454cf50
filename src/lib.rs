//! Caissa - behavioral coaching engine for chess improvement
//!
//! Caissa turns engine-analyzed games into one coaching plan at a time: it
//! extracts the user's mistakes, scores what each recurring weakness costs,
//! picks the dominant one, writes a plan for the next game, and audits that
//! game against the plan. Plan intensity rises after misses and falls after
//! executed plans; a habit that sticks is retired and the next one promoted.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): the deterministic engines and the
//!   `CoachingService` that wires them to storage
//! - **Adapters** (`adapters`): SQLite and in-memory port implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use caissa::adapters::memory::{InMemoryAnalysisSource, InMemoryProfileStore};
//! use caissa::{CoachingService, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let analysis = Arc::new(InMemoryAnalysisSource::new());
//!     let store = Arc::new(InMemoryProfileStore::new());
//!     let service = CoachingService::new(analysis, store, &Config::default())?;
//!     let outcome = service.get_current_plan("alice").await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AnalyzedGame, AuditOutcome, AuditReport, Bucket, Config, HabitState, Intensity, MistakeEvent,
    Plan, PlanDomain, PlanOutcome, RatingTier, WeaknessReport,
};
pub use domain::ports::{AnalysisSource, ProfileStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CoachingService, RuleTable};
