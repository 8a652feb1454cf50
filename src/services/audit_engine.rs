//! Audit engine.
//!
//! Replays the plan that was current before a game against the mistakes the
//! user made in that game. Each domain ends up executed, partial, missed or
//! n/a; n/a only when the plan had no rule for it.

use chrono::Utc;
use tracing::debug;

use crate::domain::models::{
    AnalyzedGame, AuditConfig, AuditReason, AuditReport, AuditResult, AuditStatus,
    AuditSummary, MistakeEvent, Plan, PlanDomain, PlanRule, RuleKind, Severity, WinState,
};
use crate::services::plan_generator::opening_family;

#[derive(Debug, Clone, Default)]
pub struct AuditEngine {
    config: AuditConfig,
}

impl AuditEngine {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Audit `game` against `plan`.
    ///
    /// `events` are the game's extracted mistakes. A missing plan yields a
    /// report where every domain is n/a.
    pub fn audit(&self, plan: Option<&Plan>, game: &AnalyzedGame, events: &[MistakeEvent]) -> AuditReport {
        let results: Vec<AuditResult> = PlanDomain::ALL
            .into_iter()
            .map(|domain| match plan {
                None => AuditResult {
                    game_id: game.game_id().to_string(),
                    plan_id: None,
                    domain,
                    status: AuditStatus::NotApplicable,
                    reason: AuditReason::StalePlan,
                    evidence: Vec::new(),
                },
                Some(plan) => self.audit_domain(plan, domain, game, events),
            })
            .collect();

        let summary = AuditSummary::from_results(&results);
        debug!(
            user_id = %game.meta.user_id,
            game_id = %game.game_id(),
            executed = summary.executed,
            partial = summary.partial,
            missed = summary.missed,
            "Audited game"
        );

        AuditReport {
            user_id: game.meta.user_id.clone(),
            game_id: game.game_id().to_string(),
            plan_id: plan.map(|p| p.plan_id),
            results,
            summary,
            audited_at: Utc::now(),
        }
    }

    fn audit_domain(
        &self,
        plan: &Plan,
        domain: PlanDomain,
        game: &AnalyzedGame,
        events: &[MistakeEvent],
    ) -> AuditResult {
        let result = |status, reason, evidence| AuditResult {
            game_id: game.game_id().to_string(),
            plan_id: Some(plan.plan_id),
            domain,
            status,
            reason,
            evidence,
        };

        let Some(rule) = plan.rule_for(domain) else {
            return result(AuditStatus::NotApplicable, AuditReason::NoRule, Vec::new());
        };

        let relevant: Vec<&MistakeEvent> = events
            .iter()
            .filter(|e| {
                e.bucket.domain() == domain
                    || (domain == PlanDomain::AdvantageDiscipline && e.win_state == WinState::Winning)
            })
            .collect();

        let materiality = self.config.materiality_cp.for_domain(domain);
        let material: Vec<&MistakeEvent> = relevant
            .iter()
            .copied()
            .filter(|e| e.severity == Severity::Blunder || e.cp_loss >= materiality)
            .collect();

        if !material.is_empty() {
            return result(
                AuditStatus::Missed,
                AuditReason::MaterialViolation,
                material.iter().map(|e| e.evidence()).collect(),
            );
        }
        if !relevant.is_empty() {
            return result(
                AuditStatus::Partial,
                AuditReason::MinorViolations,
                relevant.iter().map(|e| e.evidence()).collect(),
            );
        }
        if !required_behavior_observed(plan, rule, game) {
            return result(AuditStatus::Partial, AuditReason::RequiredBehaviorMissing, Vec::new());
        }
        result(AuditStatus::Executed, AuditReason::Clean, Vec::new())
    }
}

/// Whether the game shows the rule's positive behavior.
///
/// Only opening rules carry one: the recommended opening for the colour the
/// user actually played. Games without an opening name are not held against
/// the user.
fn required_behavior_observed(plan: &Plan, rule: &PlanRule, game: &AnalyzedGame) -> bool {
    if rule.kind != RuleKind::FollowOpeningPlan {
        return true;
    }
    let expected = plan
        .opening_recommendations
        .iter()
        .find(|r| r.color() == game.meta.user_color)
        .and_then(|r| r.opening());
    match (expected, game.meta.opening_name.as_deref()) {
        (Some(expected), Some(played)) => opening_family(played).eq_ignore_ascii_case(expected),
        _ => true,
    }
}
