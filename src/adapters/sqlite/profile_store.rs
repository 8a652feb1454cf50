//! SQLite implementation of the ProfileStore.
//!
//! Plans, audits and habit state are stored as JSON documents next to the
//! columns needed for lookups. The habit-state version column and the
//! current-plan pointer are the compare-and-swap points.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_timestamp, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AuditReport, Bucket, HabitState, Plan, Reflection};
use crate::domain::ports::ProfileStore;

#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn conflict(entity: &str, id: impl ToString) -> DomainError {
    DomainError::ConcurrencyConflict {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn load_habit_state(&self, user_id: &str) -> DomainResult<Option<HabitState>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT state_json, version FROM habit_states WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(json, version)| {
            let mut state: HabitState = serde_json::from_str(&json)?;
            state.version = version;
            Ok(state)
        })
        .transpose()
    }

    async fn save_habit_state(&self, state: &HabitState) -> DomainResult<HabitState> {
        let mut stored = state.clone();
        stored.version = state.version + 1;
        let json = serde_json::to_string(&stored)?;
        let updated_at = format_timestamp(stored.updated_at);

        let result = if state.version == 0 {
            sqlx::query(
                r#"INSERT INTO habit_states (user_id, state_json, version, updated_at) VALUES (?, ?, ?, ?)
                   ON CONFLICT(user_id) DO NOTHING"#,
            )
            .bind(&state.user_id)
            .bind(&json)
            .bind(stored.version)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE habit_states SET state_json = ?, version = ?, updated_at = ? WHERE user_id = ? AND version = ?",
            )
            .bind(&json)
            .bind(stored.version)
            .bind(&updated_at)
            .bind(&state.user_id)
            .bind(state.version)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(conflict("habit_state", &state.user_id));
        }
        Ok(stored)
    }

    async fn current_plan(&self, user_id: &str) -> DomainResult<Option<Plan>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"SELECT p.plan_json FROM current_plans c
               JOIN plans p ON p.plan_id = c.plan_id
               WHERE c.user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .transpose()
    }

    async fn get_plan(&self, plan_id: Uuid) -> DomainResult<Option<Plan>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT plan_json FROM plans WHERE plan_id = ?")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .transpose()
    }

    async fn supersede_plan(&self, plan: &Plan, expected_current: Option<Uuid>) -> DomainResult<()> {
        let json = serde_json::to_string(plan)?;
        let now = format_timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO plans (plan_id, user_id, created_at, based_on_game_id, supersedes, plan_json)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(plan.plan_id.to_string())
        .bind(&plan.user_id)
        .bind(format_timestamp(plan.created_at))
        .bind(&plan.based_on_game_id)
        .bind(plan.supersedes.map(|id| id.to_string()))
        .bind(&json)
        .execute(&mut *tx)
        .await?;

        let moved = match expected_current {
            None => sqlx::query(
                r#"INSERT INTO current_plans (user_id, plan_id, updated_at) VALUES (?, ?, ?)
                   ON CONFLICT(user_id) DO NOTHING"#,
            )
            .bind(&plan.user_id)
            .bind(plan.plan_id.to_string())
            .bind(&now)
            .execute(&mut *tx)
            .await?,
            Some(expected) => sqlx::query(
                "UPDATE current_plans SET plan_id = ?, updated_at = ? WHERE user_id = ? AND plan_id = ?",
            )
            .bind(plan.plan_id.to_string())
            .bind(&now)
            .bind(&plan.user_id)
            .bind(expected.to_string())
            .execute(&mut *tx)
            .await?,
        };

        if moved.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(conflict("current_plan", &plan.user_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn plan_history(&self, user_id: &str, limit: usize) -> DomainResult<Vec<Plan>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT plan_json FROM plans WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .collect()
    }

    async fn save_audit(&self, report: &AuditReport) -> DomainResult<()> {
        let json = serde_json::to_string(report)?;
        sqlx::query(
            r#"INSERT INTO audits (user_id, game_id, plan_id, report_json, audited_at) VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id, game_id) DO NOTHING"#,
        )
        .bind(&report.user_id)
        .bind(&report.game_id)
        .bind(report.plan_id.map(|id| id.to_string()))
        .bind(&json)
        .bind(format_timestamp(report.audited_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_audit(&self, user_id: &str, game_id: &str) -> DomainResult<Option<AuditReport>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT report_json FROM audits WHERE user_id = ? AND game_id = ?")
                .bind(user_id)
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .transpose()
    }

    async fn latest_audit(&self, user_id: &str) -> DomainResult<Option<AuditReport>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT report_json FROM audits WHERE user_id = ? ORDER BY audited_at DESC, rowid DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .transpose()
    }

    async fn record_reflection(&self, reflection: &Reflection) -> DomainResult<()> {
        sqlx::query("INSERT INTO reflections (id, user_id, bucket, created_at) VALUES (?, ?, ?, ?)")
            .bind(reflection.id.to_string())
            .bind(&reflection.user_id)
            .bind(reflection.bucket.as_str())
            .bind(format_timestamp(reflection.created_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reflections_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Reflection>> {
        let rows: Vec<ReflectionRow> = sqlx::query_as(
            r#"SELECT id, user_id, bucket, created_at FROM reflections
               WHERE user_id = ? AND created_at >= ?
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(user_id)
        .bind(format_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reflection::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ReflectionRow {
    id: String,
    user_id: String,
    bucket: String,
    created_at: String,
}

impl TryFrom<ReflectionRow> for Reflection {
    type Error = DomainError;

    fn try_from(row: ReflectionRow) -> Result<Self, Self::Error> {
        let bucket = Bucket::from_str(&row.bucket).ok_or(DomainError::UnknownBucket(row.bucket))?;
        Ok(Self {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            bucket,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
