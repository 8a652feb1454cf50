//! Cost-score engine.
//!
//! Cost formula per bucket:
//! `Σ(EvalDrop × ContextWeight × SeverityWeight) + FrequencyWeight × count + InstabilityBoost`
//!
//! The score is a pure function of the event window and the reflection
//! counts. Self-reports are tracked as a separate, capped component.

use std::collections::BTreeMap;

use crate::domain::models::{
    Bucket, CostScore, EvidenceSource, MistakeEvent, ReflectionBoost, ScoreBreakdown,
    ScoringConfig, Severity, WinState,
};

/// Computes per-bucket cost scores.
#[derive(Debug, Clone, Default)]
pub struct CostScoreEngine {
    config: ScoringConfig,
}

impl CostScoreEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every bucket, in bucket order.
    ///
    /// `reflections` maps a bucket to the number of self-reports in the window.
    pub fn score(&self, events: &[MistakeEvent], reflections: &BTreeMap<Bucket, usize>) -> Vec<CostScore> {
        Bucket::ALL
            .into_iter()
            .map(|bucket| {
                let bucket_events: Vec<&MistakeEvent> =
                    events.iter().filter(|e| e.bucket == bucket).collect();
                let reports = reflections.get(&bucket).copied().unwrap_or(0);
                self.score_bucket(bucket, &bucket_events, reports)
            })
            .collect()
    }

    /// Score a single bucket from its events.
    pub fn score_bucket(&self, bucket: Bucket, events: &[&MistakeEvent], reports: usize) -> CostScore {
        let mut breakdown = ScoreBreakdown::default();
        let mut winning_events: u32 = 0;

        for event in events {
            breakdown.eval_component +=
                self.eval_drop(event) * self.context_weight(event) * self.severity_weight(event.severity);
            if event.win_state == WinState::Winning {
                winning_events += 1;
            }
        }
        breakdown.frequency_component = self.config.frequency_weight * events.len() as f64;
        breakdown.instability_component = self.config.instability_boost * f64::from(winning_events);

        let reflection = self.reflection_boost(breakdown.total(), reports);

        CostScore {
            bucket,
            value: breakdown.total() + reflection.applied,
            sample_events: events.len(),
            winning_events: winning_events as usize,
            breakdown,
            reflection,
        }
    }

    /// cp_loss in pawns, capped.
    fn eval_drop(&self, event: &MistakeEvent) -> f64 {
        f64::from(event.cp_loss.min(self.config.cp_loss_cap).max(0)) / 100.0
    }

    fn context_weight(&self, event: &MistakeEvent) -> f64 {
        let weights = &self.config.context_weights;
        match event.win_state {
            WinState::Losing => weights.losing,
            WinState::Equal => weights.equal,
            WinState::Winning => weights.winning,
        }
    }

    fn severity_weight(&self, severity: Severity) -> f64 {
        let weights = &self.config.severity_weights;
        match severity {
            Severity::Blunder => weights.blunder,
            Severity::Mistake => weights.mistake,
            Severity::Inaccuracy => weights.inaccuracy,
        }
    }

    /// Self-report boost, capped at `reflection_cap_fraction` of the bucket total.
    ///
    /// With cap fraction `f`, `applied / (objective + applied) <= f`, which
    /// bounds `applied` by `objective × f / (1 − f)`.
    fn reflection_boost(&self, objective: f64, reports: usize) -> ReflectionBoost {
        let raw = self.config.reflection_weight * reports as f64;
        let fraction = self.config.reflection_cap_fraction;
        let cap = if fraction >= 1.0 {
            f64::INFINITY
        } else if fraction <= 0.0 {
            0.0
        } else {
            objective * fraction / (1.0 - fraction)
        };

        ReflectionBoost {
            source: EvidenceSource::SelfReport,
            reports,
            raw,
            applied: raw.min(cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Phase;

    fn event(bucket: Bucket, severity: Severity, cp_loss: i32, eval_before: i32) -> MistakeEvent {
        MistakeEvent {
            game_id: "g".to_string(),
            move_number: 20,
            bucket,
            phase: Phase::Middlegame,
            eval_before,
            eval_after: eval_before - cp_loss,
            cp_loss,
            win_state: WinState::classify(eval_before, 150),
            severity,
            fen: String::new(),
            played_move: None,
            best_move: None,
        }
    }

    fn score_of(scores: &[CostScore], bucket: Bucket) -> &CostScore {
        scores.iter().find(|s| s.bucket == bucket).unwrap()
    }

    #[test]
    fn test_formula_terms() {
        let engine = CostScoreEngine::default();
        let events = vec![
            event(Bucket::PieceSafety, Severity::Blunder, 350, 0),
            event(Bucket::PieceSafety, Severity::Mistake, 120, 200),
        ];
        let scores = engine.score(&events, &BTreeMap::new());
        let s = score_of(&scores, Bucket::PieceSafety);

        // 3.5 × 1.0 × 3 + 1.2 × 1.0 × 2 = 12.9
        assert!((s.breakdown.eval_component - 12.9).abs() < 1e-9);
        assert!((s.breakdown.frequency_component - 1.0).abs() < 1e-9);
        assert!((s.breakdown.instability_component - 1.5).abs() < 1e-9);
        assert!((s.value - 15.4).abs() < 1e-9);
        assert_eq!(s.sample_events, 2);
        assert_eq!(s.winning_events, 1);
    }

    #[test]
    fn test_every_bucket_is_scored() {
        let scores = CostScoreEngine::default().score(&[], &BTreeMap::new());
        assert_eq!(scores.len(), Bucket::ALL.len());
        assert!(scores.iter().all(|s| s.value == 0.0 && s.sample_events == 0));
    }

    #[test]
    fn test_losing_positions_weigh_less() {
        let engine = CostScoreEngine::default();
        let losing = engine.score(&[event(Bucket::ThreatAwareness, Severity::Mistake, 200, -400)], &BTreeMap::new());
        let equal = engine.score(&[event(Bucket::ThreatAwareness, Severity::Mistake, 200, 0)], &BTreeMap::new());
        assert!(score_of(&losing, Bucket::ThreatAwareness).value < score_of(&equal, Bucket::ThreatAwareness).value);
    }

    #[test]
    fn test_cp_loss_is_capped() {
        let engine = CostScoreEngine::default();
        let huge = engine.score(&[event(Bucket::PieceSafety, Severity::Blunder, 4000, 0)], &BTreeMap::new());
        let capped = engine.score(&[event(Bucket::PieceSafety, Severity::Blunder, 1000, 0)], &BTreeMap::new());
        assert_eq!(score_of(&huge, Bucket::PieceSafety).value, score_of(&capped, Bucket::PieceSafety).value);
    }

    #[test]
    fn test_chronic_low_grade_errors_accumulate() {
        let engine = CostScoreEngine::default();
        let chronic: Vec<MistakeEvent> = (0..10)
            .map(|_| event(Bucket::ThreatAwareness, Severity::Inaccuracy, 60, 0))
            .collect();
        let scores = engine.score(&chronic, &BTreeMap::new());
        let s = score_of(&scores, Bucket::ThreatAwareness);
        assert!((s.breakdown.frequency_component - 5.0).abs() < 1e-9);
        assert!(s.value > 10.0);
    }

    #[test]
    fn test_reflection_boost_is_capped_and_tagged() {
        let engine = CostScoreEngine::default();
        let events = vec![event(Bucket::TimeDiscipline, Severity::Inaccuracy, 100, 0)];
        let reflections = BTreeMap::from([(Bucket::TimeDiscipline, 50), (Bucket::PieceSafety, 3)]);
        let scores = engine.score(&events, &reflections);

        let time = score_of(&scores, Bucket::TimeDiscipline);
        assert_eq!(time.reflection.source, EvidenceSource::SelfReport);
        assert_eq!(time.reflection.reports, 50);
        assert!((time.reflection.raw - 50.0).abs() < 1e-9);
        // objective 1.0 + 0.5 = 1.5, so the boost may add at most 1.5 more
        assert!((time.reflection.applied - 1.5).abs() < 1e-9);
        assert!(time.reflection.applied <= time.value * 0.5 + 1e-9);

        // self-reports alone never create a cost
        let safety = score_of(&scores, Bucket::PieceSafety);
        assert_eq!(safety.value, 0.0);
        assert_eq!(safety.reflection.applied, 0.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let engine = CostScoreEngine::default();
        let events = vec![
            event(Bucket::PieceSafety, Severity::Blunder, 333, 10),
            event(Bucket::TacticalExecution, Severity::Mistake, 170, 300),
        ];
        let a = engine.score(&events, &BTreeMap::new());
        let b = engine.score(&events, &BTreeMap::new());
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
