//! Analysis source port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::AnalyzedGame;

/// Read-only access to games the external engine has finished analyzing.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    /// Most recent analyzed games for a user, newest first.
    ///
    /// Games are ordered by `played_at` descending, then `game_id` descending.
    async fn recent_games(&self, user_id: &str, limit: usize) -> DomainResult<Vec<AnalyzedGame>>;

    /// Number of analyzed games for a user.
    async fn count_games(&self, user_id: &str) -> DomainResult<usize>;

    /// Current rating for a user, if known.
    async fn user_rating(&self, user_id: &str) -> DomainResult<Option<u32>>;
}
