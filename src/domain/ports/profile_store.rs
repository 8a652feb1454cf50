//! Profile store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AuditReport, HabitState, Plan, Reflection};

/// Persistence for per-user coaching state.
///
/// Writes that race on the same user are compare-and-swap: a stale writer
/// gets `DomainError::ConcurrencyConflict` and must re-read.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a user's habit state.
    async fn load_habit_state(&self, user_id: &str) -> DomainResult<Option<HabitState>>;

    /// Insert (version 0) or update (matching version) a habit state.
    ///
    /// Returns the stored state with its new version.
    async fn save_habit_state(&self, state: &HabitState) -> DomainResult<HabitState>;

    /// The user's current plan.
    async fn current_plan(&self, user_id: &str) -> DomainResult<Option<Plan>>;

    /// Any plan from history by id.
    async fn get_plan(&self, plan_id: Uuid) -> DomainResult<Option<Plan>>;

    /// Append `plan` to history and make it current, provided the current
    /// pointer still references `expected_current`.
    async fn supersede_plan(&self, plan: &Plan, expected_current: Option<Uuid>) -> DomainResult<()>;

    /// Plans for a user, newest first.
    async fn plan_history(&self, user_id: &str, limit: usize) -> DomainResult<Vec<Plan>>;

    /// Store an audit report. A second report for the same game is ignored.
    async fn save_audit(&self, report: &AuditReport) -> DomainResult<()>;

    /// Stored audit for a specific game.
    async fn find_audit(&self, user_id: &str, game_id: &str) -> DomainResult<Option<AuditReport>>;

    /// Most recently stored audit for a user.
    async fn latest_audit(&self, user_id: &str) -> DomainResult<Option<AuditReport>>;

    /// Record a self-report.
    async fn record_reflection(&self, reflection: &Reflection) -> DomainResult<()>;

    /// Self-reports created at or after `since`, oldest first.
    async fn reflections_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Reflection>>;
}
