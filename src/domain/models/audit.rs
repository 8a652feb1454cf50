//! Audit results for a played game against the plan that preceded it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::habit::HabitTransition;
use super::mistake::Evidence;
use super::taxonomy::PlanDomain;

/// Execution status of one plan domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Executed,
    Partial,
    Missed,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Partial => "partial",
            Self::Missed => "missed",
            Self::NotApplicable => "n/a",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "executed" => Some(Self::Executed),
            "partial" => Some(Self::Partial),
            "missed" => Some(Self::Missed),
            "n/a" | "not_applicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Why a domain received its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditReason {
    Clean,
    MinorViolations,
    MaterialViolation,
    RequiredBehaviorMissing,
    NoRule,
    StalePlan,
}

/// Audit of a single domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub game_id: String,
    pub plan_id: Option<Uuid>,
    pub domain: PlanDomain,
    pub status: AuditStatus,
    pub reason: AuditReason,
    pub evidence: Vec<Evidence>,
}

/// Rollup across the audited domains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub executed: usize,
    pub partial: usize,
    pub missed: usize,
    pub not_applicable: usize,
    /// Domains with a rule, i.e. not n/a
    pub domains_shown: usize,
    /// executed / domains_shown, 0 when nothing was shown
    pub execution_score: f64,
}

impl AuditSummary {
    pub fn from_results(results: &[AuditResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                AuditStatus::Executed => summary.executed += 1,
                AuditStatus::Partial => summary.partial += 1,
                AuditStatus::Missed => summary.missed += 1,
                AuditStatus::NotApplicable => summary.not_applicable += 1,
            }
        }
        summary.domains_shown = summary.executed + summary.partial + summary.missed;
        summary.execution_score = if summary.domains_shown == 0 {
            0.0
        } else {
            summary.executed as f64 / summary.domains_shown as f64
        };
        summary
    }
}

/// Full audit of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub user_id: String,
    pub game_id: String,
    pub plan_id: Option<Uuid>,
    pub results: Vec<AuditResult>,
    pub summary: AuditSummary,
    pub audited_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn result_for(&self, domain: PlanDomain) -> Option<&AuditResult> {
        self.results.iter().find(|r| r.domain == domain)
    }

    pub fn status_for(&self, domain: PlanDomain) -> AuditStatus {
        self.result_for(domain)
            .map_or(AuditStatus::NotApplicable, |r| r.status)
    }
}

/// `audit_last_game` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// No analyzed game exists yet
    NoGames,
    /// Latest game is the one the current plan was built from
    NothingToAudit { game_id: String },
    Audited {
        report: AuditReport,
        transition: Option<HabitTransition>,
        /// True when the stored report was returned unchanged
        replayed: bool,
    },
}
