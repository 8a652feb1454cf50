//! In-memory profile store with the same compare-and-swap semantics as the
//! SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AuditReport, HabitState, Plan, Reflection};
use crate::domain::ports::ProfileStore;

#[derive(Default)]
struct Profiles {
    habits: HashMap<String, HabitState>,
    /// Append-only, oldest first
    plans: Vec<Plan>,
    current: HashMap<String, Uuid>,
    /// Insertion order
    audits: Vec<AuditReport>,
    reflections: Vec<Reflection>,
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    inner: RwLock<Profiles>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load_habit_state(&self, user_id: &str) -> DomainResult<Option<HabitState>> {
        Ok(self.inner.read().await.habits.get(user_id).cloned())
    }

    async fn save_habit_state(&self, state: &HabitState) -> DomainResult<HabitState> {
        let mut inner = self.inner.write().await;
        let stored_version = inner.habits.get(&state.user_id).map_or(0, |s| s.version);
        if stored_version != state.version {
            return Err(DomainError::ConcurrencyConflict {
                entity: "habit_state".to_string(),
                id: state.user_id.clone(),
            });
        }
        let mut stored = state.clone();
        stored.version = state.version + 1;
        inner.habits.insert(state.user_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn current_plan(&self, user_id: &str) -> DomainResult<Option<Plan>> {
        let inner = self.inner.read().await;
        Ok(inner
            .current
            .get(user_id)
            .and_then(|id| inner.plans.iter().find(|p| p.plan_id == *id))
            .cloned())
    }

    async fn get_plan(&self, plan_id: Uuid) -> DomainResult<Option<Plan>> {
        Ok(self
            .inner
            .read()
            .await
            .plans
            .iter()
            .find(|p| p.plan_id == plan_id)
            .cloned())
    }

    async fn supersede_plan(&self, plan: &Plan, expected_current: Option<Uuid>) -> DomainResult<()> {
        let mut inner = self.inner.write().await;
        if inner.current.get(&plan.user_id).copied() != expected_current {
            return Err(DomainError::ConcurrencyConflict {
                entity: "current_plan".to_string(),
                id: plan.user_id.clone(),
            });
        }
        inner.plans.push(plan.clone());
        inner.current.insert(plan.user_id.clone(), plan.plan_id);
        Ok(())
    }

    async fn plan_history(&self, user_id: &str, limit: usize) -> DomainResult<Vec<Plan>> {
        Ok(self
            .inner
            .read()
            .await
            .plans
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_audit(&self, report: &AuditReport) -> DomainResult<()> {
        let mut inner = self.inner.write().await;
        let exists = inner
            .audits
            .iter()
            .any(|a| a.user_id == report.user_id && a.game_id == report.game_id);
        if !exists {
            inner.audits.push(report.clone());
        }
        Ok(())
    }

    async fn find_audit(&self, user_id: &str, game_id: &str) -> DomainResult<Option<AuditReport>> {
        Ok(self
            .inner
            .read()
            .await
            .audits
            .iter()
            .find(|a| a.user_id == user_id && a.game_id == game_id)
            .cloned())
    }

    async fn latest_audit(&self, user_id: &str) -> DomainResult<Option<AuditReport>> {
        Ok(self
            .inner
            .read()
            .await
            .audits
            .iter()
            .rev()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn record_reflection(&self, reflection: &Reflection) -> DomainResult<()> {
        self.inner.write().await.reflections.push(reflection.clone());
        Ok(())
    }

    async fn reflections_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Reflection>> {
        let mut found: Vec<Reflection> = self
            .inner
            .read()
            .await
            .reflections
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}
