//! CLI command implementations.

pub mod audit;
pub mod history;
pub mod ingest;
pub mod init;
pub mod plan;
pub mod reflect;
pub mod weakness;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_from_config, SqliteAnalysisStore, SqliteProfileStore};
use crate::domain::models::Config;
use crate::services::CoachingService;

pub type SqliteCoachingService = CoachingService<SqliteAnalysisStore, SqliteProfileStore>;

/// Stores and service opened against the configured database.
pub struct CommandContext {
    pub analysis: Arc<SqliteAnalysisStore>,
    pub service: SqliteCoachingService,
}

impl CommandContext {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = initialize_from_config(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}. Run 'caissa init' first.", config.database.path))?;

        let analysis = Arc::new(SqliteAnalysisStore::new(pool.clone()));
        let profiles = Arc::new(SqliteProfileStore::new(pool));
        let service = CoachingService::new(Arc::clone(&analysis), profiles, config)
            .context("Failed to build coaching service")?;

        Ok(Self { analysis, service })
    }
}
