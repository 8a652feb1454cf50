//! Dominant-weakness selection.
//!
//! Primary = highest cost among eligible buckets with at least one
//! supporting event; Secondary = runner-up. Ties resolve by, in order:
//! 1. more supporting events
//! 2. the user's active unresolved habit
//! 3. lexical bucket id

use std::cmp::Ordering;

use tracing::debug;

use crate::domain::models::{
    Bucket, CostScore, HabitState, RankedBucket, SelectionConfig, WeaknessSelection,
};

/// Picks the Primary and Secondary focus from cost scores.
#[derive(Debug, Clone, Default)]
pub struct WeaknessSelector {
    config: SelectionConfig,
}

impl WeaknessSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Whether the rating band allows coaching this bucket.
    pub fn is_eligible(&self, bucket: Bucket, rating: Option<u32>) -> bool {
        match bucket {
            Bucket::EndgameFundamentals => {
                rating.is_none_or(|r| r >= self.config.endgame_min_rating)
            }
            _ => true,
        }
    }

    /// Select from a full set of scores.
    ///
    /// Resolved habits are only considered when no unresolved bucket has a
    /// supporting event.
    pub fn select(
        &self,
        scores: &[CostScore],
        rating: Option<u32>,
        habit: Option<&HabitState>,
    ) -> WeaknessSelection {
        let active = habit.and_then(HabitState::active_unresolved);
        let is_resolved = |bucket: Bucket| habit.is_some_and(|h| h.is_resolved(bucket));

        let candidates: Vec<&CostScore> = scores
            .iter()
            .filter(|s| s.sample_events > 0 && self.is_eligible(s.bucket, rating))
            .collect();

        let unresolved: Vec<&CostScore> = candidates
            .iter()
            .copied()
            .filter(|s| !is_resolved(s.bucket))
            .collect();

        let mut pool = if unresolved.is_empty() { candidates } else { unresolved };
        pool.sort_by(|a, b| rank(a, b, active));

        let mut ranked = pool.into_iter().map(|score| RankedBucket {
            bucket: score.bucket,
            score: score.clone(),
        });

        match ranked.next() {
            Some(primary) => {
                let secondary = ranked.next();
                debug!(
                    primary = primary.bucket.as_str(),
                    secondary = secondary.as_ref().map(|s| s.bucket.as_str()),
                    score = primary.score.value,
                    "Selected dominant weakness"
                );
                WeaknessSelection::Selected { primary, secondary }
            }
            None => WeaknessSelection::NoActiveWeakness,
        }
    }
}

/// Ordering for the selection pool; `Less` sorts first.
fn rank(a: &CostScore, b: &CostScore, active: Option<Bucket>) -> Ordering {
    b.quantized()
        .cmp(&a.quantized())
        .then_with(|| b.sample_events.cmp(&a.sample_events))
        .then_with(|| {
            let a_active = Some(a.bucket) == active;
            let b_active = Some(b.bucket) == active;
            b_active.cmp(&a_active)
        })
        .then_with(|| a.bucket.cmp(&b.bucket))
}
