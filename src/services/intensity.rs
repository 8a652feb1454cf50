//! Intensity adaptation and habit rotation.
//!
//! Runs once per audited game. Intensity moves by at most one step on the
//! primary domain's status. The active habit advances through
//! active → improving → resolved, one transition per audit.

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::models::{
    AuditReport, AuditStatus, BaselineSnapshot, Bucket, HabitConfig, HabitPhase, HabitState,
    HabitTransition, ResolvedHabit,
};

/// Promotion hook called after a habit resolves.
///
/// Receives the updated state (with the habit already resolved) and returns
/// the next bucket to activate together with its baseline.
pub type Promotion<'a> = dyn FnOnce(&HabitState) -> Option<(Bucket, BaselineSnapshot)> + 'a;

#[derive(Debug, Clone, Default)]
pub struct HabitLoop {
    config: HabitConfig,
}

impl HabitLoop {
    pub fn new(config: HabitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HabitConfig {
        &self.config
    }

    /// Apply one audit to the habit state.
    ///
    /// `primary` is the primary focus of the audited plan; `None` when the
    /// plan was stale, which leaves intensity untouched.
    pub fn apply(
        &self,
        state: &mut HabitState,
        report: &AuditReport,
        primary: Option<Bucket>,
        promote: Box<Promotion<'_>>,
    ) -> HabitTransition {
        let intensity_before = state.intensity;
        let phase_before = state.phase;
        let bucket = state.active_unresolved();

        let primary_status = primary.map_or(AuditStatus::NotApplicable, |b| report.status_for(b.domain()));
        state.intensity = match primary_status {
            AuditStatus::Missed => state.intensity.raised(),
            AuditStatus::Executed => state.intensity.lowered(),
            AuditStatus::Partial | AuditStatus::NotApplicable => state.intensity,
        };

        state.streak = if report.summary.missed == 0 {
            state.streak.saturating_add(1)
        } else {
            0
        };

        let mut resolved = None;
        let mut promoted = None;
        if let Some(active) = bucket {
            let attempted = self.record_attempt(state, report.status_for(active.domain()));
            if attempted && self.advance(state) == HabitPhase::Resolved {
                resolved = Some(active);
                self.resolve(state, active);
                if let Some((next, baseline)) = promote(state) {
                    state.activate(next, baseline);
                    promoted = Some(next);
                }
            }
        }

        state.last_audited_game_id = Some(report.game_id.clone());
        state.updated_at = Utc::now();

        let transition = HabitTransition {
            bucket,
            intensity_before,
            intensity_after: state.intensity,
            phase_before,
            phase_after: state.phase,
            resolved,
            promoted,
        };
        debug!(
            user_id = %state.user_id,
            game_id = %report.game_id,
            bucket = bucket.map(|b| b.as_str()),
            intensity = state.intensity.level(),
            phase = state.phase.as_str(),
            "Applied habit transition"
        );
        transition
    }

    /// Returns whether the audit counted as an attempt.
    fn record_attempt(&self, state: &mut HabitState, status: AuditStatus) -> bool {
        let attempted = match status {
            AuditStatus::Executed => {
                state.consecutive_hits += 1;
                state.consecutive_misses = 0;
                state.total_attempts += 1;
                state.total_successes += 1;
                state.recent_attempts.push_back(true);
                true
            }
            AuditStatus::Missed => {
                state.consecutive_hits = 0;
                state.consecutive_misses += 1;
                state.total_attempts += 1;
                state.recent_attempts.push_back(false);
                true
            }
            // breaks the streak without counting as a miss
            AuditStatus::Partial => {
                state.consecutive_hits = 0;
                false
            }
            AuditStatus::NotApplicable => false,
        };
        while state.recent_attempts.len() > self.config.rotation_window {
            state.recent_attempts.pop_front();
        }
        attempted
    }

    /// Move the phase at most one step. Returns the new phase.
    fn advance(&self, state: &mut HabitState) -> HabitPhase {
        let attempts = state.recent_attempts.len();
        let hits = state.recent_attempts.iter().filter(|hit| **hit).count();
        let rate = if attempts == 0 { 0.0 } else { hits as f64 / attempts as f64 };
        let improving = attempts >= self.config.min_attempts_for_improving
            && rate >= self.config.improving_success_rate;

        state.phase = match state.phase {
            HabitPhase::Active if improving => HabitPhase::Improving,
            HabitPhase::Improving
                if state.consecutive_hits >= self.config.resolve_consecutive_hits
                    || hits >= self.config.resolve_hits_in_window =>
            {
                HabitPhase::Resolved
            }
            HabitPhase::Improving if !improving => HabitPhase::Active,
            phase => phase,
        };
        state.phase
    }

    fn resolve(&self, state: &mut HabitState, bucket: Bucket) {
        if !state.is_resolved(bucket) {
            state.resolved_habits.push(ResolvedHabit {
                bucket,
                resolved_at: Utc::now(),
                attempts: state.total_attempts,
                successes: state.total_successes,
                baseline_cost: state.baseline_cost(bucket),
            });
        }
        info!(
            user_id = %state.user_id,
            bucket = bucket.as_str(),
            attempts = state.total_attempts,
            "Habit resolved"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AuditReason, AuditResult, AuditSummary, Intensity, PlanDomain};
    use std::collections::BTreeMap;

    fn report(game_id: &str, statuses: &[(PlanDomain, AuditStatus)]) -> AuditReport {
        let results: Vec<AuditResult> = statuses
            .iter()
            .map(|(domain, status)| AuditResult {
                game_id: game_id.to_string(),
                plan_id: None,
                domain: *domain,
                status: *status,
                reason: AuditReason::Clean,
                evidence: Vec::new(),
            })
            .collect();
        AuditReport {
            user_id: "u1".to_string(),
            game_id: game_id.to_string(),
            plan_id: None,
            summary: AuditSummary::from_results(&results),
            results,
            audited_at: Utc::now(),
        }
    }

    fn state(intensity: u8) -> HabitState {
        let mut state = HabitState::new("u1", Intensity::new(intensity).unwrap());
        state.activate(
            Bucket::PieceSafety,
            BaselineSnapshot { taken_at: Utc::now(), costs: BTreeMap::from([(Bucket::PieceSafety, 42.0)]) },
        );
        state
    }

    fn safety(status: AuditStatus) -> AuditReport {
        report("g", &[(PlanDomain::Safety, status)])
    }

    fn no_promotion() -> Box<Promotion<'static>> {
        Box::new(|_: &HabitState| None)
    }

    #[test]
    fn test_executed_lowers_intensity() {
        let mut s = state(3);
        let t = HabitLoop::default().apply(&mut s, &safety(AuditStatus::Executed), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(t.intensity_after.level(), 2);
        assert_eq!(s.streak, 1);
    }

    #[test]
    fn test_executed_at_floor_stays_at_one() {
        let mut s = state(1);
        HabitLoop::default().apply(&mut s, &safety(AuditStatus::Executed), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(s.intensity.level(), 1);
    }

    #[test]
    fn test_missed_raises_intensity_and_resets_streak() {
        let mut s = state(5);
        s.streak = 4;
        HabitLoop::default().apply(&mut s, &safety(AuditStatus::Missed), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(s.intensity.level(), 5);
        assert_eq!(s.streak, 0);
        assert_eq!(s.consecutive_misses, 1);
    }

    #[test]
    fn test_partial_breaks_hits_without_a_miss() {
        let mut s = state(3);
        let habit = HabitLoop::default();
        habit.apply(&mut s, &safety(AuditStatus::Executed), Some(Bucket::PieceSafety), no_promotion());
        habit.apply(&mut s, &safety(AuditStatus::Partial), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(s.consecutive_hits, 0);
        assert_eq!(s.consecutive_misses, 0);
        assert_eq!(s.recent_attempts.len(), 1);
        assert_eq!(s.intensity.level(), 2);
    }

    #[test]
    fn test_stale_plan_leaves_intensity() {
        let mut s = state(3);
        let t = HabitLoop::default().apply(&mut s, &report("g", &[]), None, no_promotion());
        assert_eq!(t.intensity_before, t.intensity_after);
        assert_eq!(s.last_audited_game_id.as_deref(), Some("g"));
    }

    #[test]
    fn test_eight_hits_resolve_and_promote() {
        let mut s = state(3);
        let habit = HabitLoop::default();
        let mut phases = Vec::new();
        let mut promoted = None;
        for _ in 0..8 {
            let t = habit.apply(
                &mut s,
                &safety(AuditStatus::Executed),
                Some(Bucket::PieceSafety),
                Box::new(|st: &HabitState| {
                    assert!(st.is_resolved(Bucket::PieceSafety));
                    Some((
                        Bucket::ThreatAwareness,
                        BaselineSnapshot { taken_at: Utc::now(), costs: BTreeMap::new() },
                    ))
                }),
            );
            phases.push(t.phase_after);
            if t.promoted.is_some() {
                promoted = t.promoted;
                break;
            }
        }
        assert_eq!(&phases[..4], &[HabitPhase::Active; 4]);
        assert_eq!(phases[4], HabitPhase::Improving);
        assert_eq!(promoted, Some(Bucket::ThreatAwareness));
        assert!(s.is_resolved(Bucket::PieceSafety));
        assert_eq!(s.resolved_habits[0].baseline_cost, Some(42.0));
        assert_eq!(s.active_bucket, Some(Bucket::ThreatAwareness));
        assert_eq!(s.phase, HabitPhase::Active);
        assert_eq!(s.total_attempts, 0);
        assert_eq!(s.intensity.level(), 1);
    }

    #[test]
    fn test_one_transition_per_audit() {
        let mut s = state(2);
        s.consecutive_hits = 7;
        s.recent_attempts = std::iter::repeat(true).take(7).collect();
        let t = HabitLoop::default().apply(&mut s, &safety(AuditStatus::Executed), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(t.phase_before, HabitPhase::Active);
        assert_eq!(t.phase_after, HabitPhase::Improving);
        assert_eq!(t.resolved, None);
    }

    #[test]
    fn test_improving_falls_back_when_rate_drops() {
        let mut s = state(2);
        s.phase = HabitPhase::Improving;
        s.recent_attempts = [true, true, true, false, false, false, false].into_iter().collect();
        HabitLoop::default().apply(&mut s, &safety(AuditStatus::Missed), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(s.phase, HabitPhase::Active);
    }

    #[test]
    fn test_unattempted_audit_does_not_advance() {
        let mut s = state(2);
        s.phase = HabitPhase::Improving;
        s.consecutive_hits = 5;
        s.recent_attempts = std::iter::repeat(true).take(5).collect();
        let habit = HabitLoop::default();
        habit.apply(&mut s, &safety(AuditStatus::NotApplicable), Some(Bucket::PieceSafety), no_promotion());
        assert_eq!(s.phase, HabitPhase::Improving);
        habit.apply(&mut s, &safety(AuditStatus::Executed), Some(Bucket::PieceSafety), no_promotion());
        assert!(s.is_resolved(Bucket::PieceSafety));
    }

    #[test]
    fn test_window_is_bounded() {
        let mut s = state(2);
        let habit = HabitLoop::default();
        for _ in 0..20 {
            habit.apply(&mut s, &safety(AuditStatus::Missed), Some(Bucket::PieceSafety), no_promotion());
        }
        assert_eq!(s.recent_attempts.len(), 8);
        assert_eq!(s.total_attempts, 20);
    }
}
