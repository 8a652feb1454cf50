//! Bounded per-user cache of scored windows.
//!
//! Extraction and scoring are pure functions of the window, so a snapshot is
//! reusable as long as its fingerprint matches. The service invalidates a
//! user's entry when a game is analyzed or a reflection is recorded.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{CacheConfig, CostScore, ExtractionReport, MistakeEvent, RatingTier};

/// Identifies the inputs a snapshot was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFingerprint {
    /// Window game ids, newest first
    pub game_ids: Vec<String>,
    pub tier: RatingTier,
    pub reflections: usize,
}

/// Extracted events and scores for one user's window.
#[derive(Debug, Clone)]
pub struct ScoreSnapshot {
    pub fingerprint: WindowFingerprint,
    pub events: Vec<MistakeEvent>,
    pub report: ExtractionReport,
    pub scores: Vec<CostScore>,
}

pub struct ScoreCache {
    entries: Cache<String, Arc<ScoreSnapshot>>,
}

impl ScoreCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();
        Self { entries }
    }

    /// Cached snapshot for `user_id`, if it was computed from `fingerprint`.
    pub async fn get(&self, user_id: &str, fingerprint: &WindowFingerprint) -> Option<Arc<ScoreSnapshot>> {
        self.entries
            .get(user_id)
            .await
            .filter(|snapshot| snapshot.fingerprint == *fingerprint)
    }

    pub async fn insert(&self, user_id: &str, snapshot: ScoreSnapshot) -> Arc<ScoreSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.entries
            .insert(user_id.to_string(), Arc::clone(&snapshot))
            .await;
        snapshot
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.entries.invalidate(user_id).await;
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
