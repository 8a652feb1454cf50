//! Long-lived per-user habit state.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use thiserror::Error;

use super::taxonomy::Bucket;

/// Intensity outside 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid intensity: {0} (must be 1-5)")]
pub struct InvalidIntensity(pub u8);

/// Training intensity, 1 (Light) to 5 (Critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(5);

    pub fn new(level: u8) -> Result<Self, InvalidIntensity> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(InvalidIntensity(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// One step up, saturating at 5.
    pub fn raised(self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX.0))
    }

    /// One step down, saturating at 1.
    pub fn lowered(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN.0))
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Light",
            2 => "Moderate",
            3 => "Focused",
            4 => "Intense",
            _ => "Critical",
        }
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for Intensity {
    type Error = InvalidIntensity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Intensity> for u8 {
    fn from(value: Intensity) -> Self {
        value.0
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

/// Rotation phase of the active habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitPhase {
    #[default]
    Active,
    Improving,
    Resolved,
}

impl HabitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Improving => "improving",
            Self::Resolved => "resolved",
        }
    }
}

/// A habit that was retired after sustained success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHabit {
    pub bucket: Bucket,
    pub resolved_at: DateTime<Utc>,
    pub attempts: u32,
    pub successes: u32,
    pub baseline_cost: Option<f64>,
}

/// Cost scores captured when a habit became active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub taken_at: DateTime<Utc>,
    pub costs: BTreeMap<Bucket, f64>,
}

/// Per-user coaching state, mutated after every audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitState {
    pub user_id: String,
    pub active_bucket: Option<Bucket>,
    pub phase: HabitPhase,
    pub intensity: Intensity,
    pub consecutive_hits: u32,
    pub consecutive_misses: u32,
    /// Most recent attempt last; true means the habit was executed
    pub recent_attempts: VecDeque<bool>,
    pub total_attempts: u32,
    pub total_successes: u32,
    pub resolved_habits: Vec<ResolvedHabit>,
    /// Consecutive audited games without a missed domain
    pub streak: u32,
    pub baseline: Option<BaselineSnapshot>,
    pub last_audited_game_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-lock version; 0 means never persisted
    pub version: i64,
}

impl HabitState {
    pub fn new(user_id: impl Into<String>, intensity: Intensity) -> Self {
        Self {
            user_id: user_id.into(),
            active_bucket: None,
            phase: HabitPhase::Active,
            intensity,
            consecutive_hits: 0,
            consecutive_misses: 0,
            recent_attempts: VecDeque::new(),
            total_attempts: 0,
            total_successes: 0,
            resolved_habits: Vec::new(),
            streak: 0,
            baseline: None,
            last_audited_game_id: None,
            updated_at: Utc::now(),
            version: 0,
        }
    }

    pub fn is_resolved(&self, bucket: Bucket) -> bool {
        self.resolved_habits.iter().any(|h| h.bucket == bucket)
    }

    pub fn resolved_buckets(&self) -> Vec<Bucket> {
        let mut buckets: Vec<Bucket> = self.resolved_habits.iter().map(|h| h.bucket).collect();
        buckets.sort_unstable();
        buckets.dedup();
        buckets
    }

    /// The active bucket, if it has not been resolved.
    pub fn active_unresolved(&self) -> Option<Bucket> {
        self.active_bucket.filter(|b| !self.is_resolved(*b))
    }

    pub fn baseline_cost(&self, bucket: Bucket) -> Option<f64> {
        self.baseline
            .as_ref()
            .and_then(|b| b.costs.get(&bucket).copied())
    }

    /// Make `bucket` the active habit, resetting rotation progress.
    ///
    /// Intensity is left unchanged.
    pub fn activate(&mut self, bucket: Bucket, baseline: BaselineSnapshot) {
        self.active_bucket = Some(bucket);
        self.phase = HabitPhase::Active;
        self.consecutive_hits = 0;
        self.consecutive_misses = 0;
        self.recent_attempts.clear();
        self.total_attempts = 0;
        self.total_successes = 0;
        self.baseline = Some(baseline);
    }
}

/// Outcome of one pass of the adaptation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitTransition {
    pub bucket: Option<Bucket>,
    pub intensity_before: Intensity,
    pub intensity_after: Intensity,
    pub phase_before: HabitPhase,
    pub phase_after: HabitPhase,
    /// Bucket retired by this audit
    pub resolved: Option<Bucket>,
    /// Bucket promoted to active after a resolution
    pub promoted: Option<Bucket>,
}

/// A user's self-report that a bucket is costing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub bucket: Bucket,
    pub created_at: DateTime<Utc>,
}

impl Reflection {
    pub fn new(user_id: impl Into<String>, bucket: Bucket) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            bucket,
            // stored timestamps keep microseconds
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}
