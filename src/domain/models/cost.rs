//! Cost scores and weakness selection results.

use serde::{Deserialize, Serialize};

use super::mistake::Evidence;
use super::taxonomy::Bucket;

/// Where a piece of score evidence came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Engine-evaluated mistakes from analyzed games
    EngineAnalysis,
    /// User self-reports submitted through reflections
    #[default]
    SelfReport,
}

/// Per-term contribution to a bucket's objective score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Σ(EvalDrop × ContextWeight × SeverityWeight)
    pub eval_component: f64,
    /// FrequencyWeight × event count
    pub frequency_component: f64,
    /// Additive bonus for errors made while winning
    pub instability_component: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.eval_component + self.frequency_component + self.instability_component
    }
}

/// Capped self-report contribution, kept apart from the objective score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionBoost {
    pub source: EvidenceSource,
    pub reports: usize,
    /// Uncapped boost
    pub raw: f64,
    /// Boost after the cap was applied
    pub applied: f64,
}

/// How much a bucket is currently costing the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostScore {
    pub bucket: Bucket,
    /// Objective score plus the applied reflection boost
    pub value: f64,
    /// Number of supporting mistake events in the window
    pub sample_events: usize,
    /// Events made while winning
    pub winning_events: usize,
    pub breakdown: ScoreBreakdown,
    pub reflection: ReflectionBoost,
}

impl CostScore {
    pub fn objective(&self) -> f64 {
        self.breakdown.total()
    }

    /// Score quantised to 1e-4 so equal scores compare equal.
    pub fn quantized(&self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let q = (self.value * 10_000.0).round() as i64;
        q
    }
}

/// A bucket that won a selection slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBucket {
    pub bucket: Bucket,
    pub score: CostScore,
}

/// Outcome of dominant-weakness selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeaknessSelection {
    Selected {
        primary: RankedBucket,
        secondary: Option<RankedBucket>,
    },
    /// No eligible bucket has a supporting event
    NoActiveWeakness,
}

impl WeaknessSelection {
    pub fn primary(&self) -> Option<Bucket> {
        match self {
            Self::Selected { primary, .. } => Some(primary.bucket),
            Self::NoActiveWeakness => None,
        }
    }

    pub fn secondary(&self) -> Option<Bucket> {
        match self {
            Self::Selected { secondary, .. } => secondary.as_ref().map(|s| s.bucket),
            Self::NoActiveWeakness => None,
        }
    }
}

/// `get_dominant_weakness` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeaknessReport {
    NeedsMoreGames {
        analyzed_games: usize,
        required: usize,
    },
    AllClear {
        streak: u32,
    },
    Dominant {
        bucket: Bucket,
        cost_score: CostScore,
        secondary: Option<Bucket>,
        evidence: Vec<GameEvidence>,
        /// Cost of this bucket when it became the active habit
        baseline_cost: Option<f64>,
    },
}

/// Evidence tagged with the game it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvidence {
    pub game_id: String,
    #[serde(flatten)]
    pub evidence: Evidence,
}
