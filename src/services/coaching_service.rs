//! Coaching service.
//!
//! Wires the pure engines (extractor, scorer, selector, generator, auditor,
//! habit loop) to the analysis source and the profile store. All per-user
//! writes go through compare-and-swap with a bounded retry.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AnalyzedGame, AuditOutcome, BaselineSnapshot, Bucket, Config, CostScore, GameEvidence,
    HabitState, Intensity, Plan, PlanOutcome, RatingTier, Reflection, ScoringConfig, StoreConfig,
    WeaknessReport, WeaknessSelection,
};
use crate::domain::ports::{AnalysisSource, ProfileStore};
use crate::services::audit_engine::AuditEngine;
use crate::services::cost_scorer::CostScoreEngine;
use crate::services::event_extractor::MoveEventExtractor;
use crate::services::intensity::HabitLoop;
use crate::services::plan_generator::{PlanGenerator, PlanRequest};
use crate::services::rule_table::RuleTable;
use crate::services::score_cache::{ScoreCache, ScoreSnapshot, WindowFingerprint};
use crate::services::weakness_selector::WeaknessSelector;

/// A user's scored window plus the context it was computed in.
struct Window {
    /// Newest first; may extend past the scoring window for opening stats
    games: Vec<AnalyzedGame>,
    rating: Option<u32>,
    snapshot: Arc<ScoreSnapshot>,
}

pub struct CoachingService<A: AnalysisSource, S: ProfileStore> {
    analysis: Arc<A>,
    store: Arc<S>,
    extractor: MoveEventExtractor,
    scorer: CostScoreEngine,
    selector: WeaknessSelector,
    generator: PlanGenerator,
    auditor: AuditEngine,
    habit_loop: HabitLoop,
    cache: ScoreCache,
    store_config: StoreConfig,
    opening_stats_games: usize,
    initial_intensity: Intensity,
}

impl<A: AnalysisSource, S: ProfileStore> CoachingService<A, S> {
    /// Build the service from configuration.
    ///
    /// Loads the rule table from `plan.rule_table_path` when set.
    pub fn new(analysis: Arc<A>, store: Arc<S>, config: &Config) -> DomainResult<Self> {
        let rules = match &config.plan.rule_table_path {
            Some(path) => RuleTable::from_file(path)
                .map_err(|e| DomainError::ValidationFailed(e.to_string()))?,
            None => RuleTable::builtin(),
        };
        let initial_intensity = Intensity::new(config.habit.initial_intensity)
            .map_err(|e| DomainError::ValidationFailed(e.to_string()))?;
        let selector = WeaknessSelector::new(config.selection.clone());

        Ok(Self {
            analysis,
            store,
            extractor: MoveEventExtractor::new(config.extractor.clone()),
            scorer: CostScoreEngine::new(config.scoring.clone()),
            generator: PlanGenerator::new(config.plan.clone(), rules, selector.clone()),
            selector,
            auditor: AuditEngine::new(config.audit.clone()),
            habit_loop: HabitLoop::new(config.habit.clone()),
            cache: ScoreCache::new(&config.cache),
            store_config: config.store.clone(),
            opening_stats_games: config.plan.opening_stats_games,
            initial_intensity,
        })
    }

    fn scoring(&self) -> &ScoringConfig {
        self.scorer.config()
    }

    /// The user's current plan, regenerated if a newer game has been analyzed.
    ///
    /// Games played since the outgoing plan are audited against it first,
    /// oldest first, so intensity reflects them before the next plan is built.
    #[instrument(skip(self))]
    pub async fn get_current_plan(&self, user_id: &str) -> DomainResult<PlanOutcome> {
        let analyzed_games = self.analysis.count_games(user_id).await?;
        if analyzed_games < self.scoring().min_games {
            return Ok(PlanOutcome::NeedsMoreGames {
                analyzed_games,
                required: self.scoring().min_games,
            });
        }

        let mut attempt = 0;
        loop {
            let current = self.store.current_plan(user_id).await?;
            let window = self.window(user_id).await?;
            let Some(latest) = window.games.first() else {
                return Ok(PlanOutcome::NeedsMoreGames {
                    analyzed_games: 0,
                    required: self.scoring().min_games,
                });
            };

            if let Some(plan) = &current {
                if plan.based_on_game_id == latest.game_id() {
                    return Ok(PlanOutcome::Ready {
                        plan: Box::new(plan.clone()),
                        regenerated: false,
                    });
                }
                self.audit_pending_games(user_id, plan, &window).await?;
            }

            let selection = {
                let state = self.store.load_habit_state(user_id).await?;
                self.selector
                    .select(&window.snapshot.scores, window.rating, state.as_ref())
            };
            let WeaknessSelection::Selected { primary, secondary } = selection else {
                let streak = self
                    .store
                    .load_habit_state(user_id)
                    .await?
                    .map_or(0, |s| s.streak);
                info!(user_id, streak, "No active weakness");
                return Ok(PlanOutcome::AllClear { streak });
            };

            let scores = &window.snapshot.scores;
            let (state, _) = self
                .update_habit_state(user_id, |state| {
                    // an unresolved habit only hands over through resolution
                    if state.active_unresolved().is_some() {
                        None
                    } else {
                        state.activate(primary.bucket, baseline(scores));
                        Some(())
                    }
                })
                .await?;

            let previous_audit = self.store.latest_audit(user_id).await?;
            let plan = self.generator.generate(&PlanRequest {
                user_id,
                primary: primary.bucket,
                secondary: secondary.as_ref().map(|s| s.bucket),
                rating: window.rating,
                intensity: state.intensity,
                games: &window.games,
                events: &window.snapshot.events,
                previous_audit: previous_audit.as_ref(),
                supersedes: current.as_ref().map(|p| p.plan_id),
            });

            match self
                .store
                .supersede_plan(&plan, current.as_ref().map(|p| p.plan_id))
                .await
            {
                Ok(()) => {
                    info!(
                        user_id,
                        plan_id = %plan.plan_id,
                        game_id = %plan.based_on_game_id,
                        bucket = plan.primary_focus.as_str(),
                        intensity = plan.intensity.level(),
                        "Plan regenerated"
                    );
                    return Ok(PlanOutcome::Ready {
                        plan: Box::new(plan),
                        regenerated: true,
                    });
                }
                Err(e) if e.is_conflict() && attempt < self.store_config.max_update_retries => {
                    debug!(user_id, attempt = attempt + 1, "Current plan moved, retrying");
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(user_id, game_id = %plan.based_on_game_id, error = %e, "Failed to store plan");
                    return Err(e);
                }
            }
        }
    }

    /// Audit the latest analyzed game against the current plan.
    ///
    /// Idempotent: a game that already has a stored audit returns that
    /// report and leaves habit state alone.
    #[instrument(skip(self))]
    pub async fn audit_last_game(&self, user_id: &str) -> DomainResult<AuditOutcome> {
        let Some(game) = self.analysis.recent_games(user_id, 1).await?.into_iter().next() else {
            return Ok(AuditOutcome::NoGames);
        };

        if let Some(report) = self.store.find_audit(user_id, game.game_id()).await? {
            debug!(user_id, game_id = game.game_id(), "Audit already stored");
            return Ok(AuditOutcome::Audited {
                report,
                transition: None,
                replayed: true,
            });
        }

        let plan = self.store.current_plan(user_id).await?;
        let window = self.window(user_id).await?;
        self.audit_game(user_id, &game, plan.as_ref(), &window).await
    }

    /// Audit every game played since `plan` was built, oldest first.
    ///
    /// When the plan's source game has left the window only the newest game
    /// is audited.
    async fn audit_pending_games(&self, user_id: &str, plan: &Plan, window: &Window) -> DomainResult<()> {
        let based_on = plan.based_on_game_id.as_str();
        let pending: Vec<&AnalyzedGame> = if window.games.iter().any(|g| g.game_id() == based_on) {
            window.games.iter().take_while(|g| g.game_id() != based_on).collect()
        } else {
            window.games.iter().take(1).collect()
        };

        // skip on habit state, not on stored audits: a report can land
        // before its habit update does
        let state = self.store.load_habit_state(user_id).await?;
        for game in pending.into_iter().rev() {
            if state
                .as_ref()
                .is_some_and(|s| already_applied(s, game.game_id(), &window.games))
            {
                continue;
            }
            self.audit_game(user_id, game, Some(plan), window).await?;
        }
        Ok(())
    }

    async fn audit_game(
        &self,
        user_id: &str,
        game: &AnalyzedGame,
        plan: Option<&Plan>,
        window: &Window,
    ) -> DomainResult<AuditOutcome> {
        let game_id = game.game_id().to_string();
        if plan.is_some_and(|p| p.based_on_game_id == game_id) {
            return Ok(AuditOutcome::NothingToAudit { game_id });
        }

        let tier = RatingTier::from_rating(window.rating);
        let (events, _) = self.extractor.extract(game, tier);
        let report = self.auditor.audit(plan, game, &events);
        self.store.save_audit(&report).await.inspect_err(|e| {
            error!(user_id, game_id = %game_id, error = %e, "Failed to store audit");
        })?;

        let primary = plan.map(|p| p.primary_focus);
        let scores = &window.snapshot.scores;
        let selector = &self.selector;
        let rating = window.rating;
        let (_, transition) = self
            .update_habit_state(user_id, |state| {
                if already_applied(state, &game_id, &window.games) {
                    return None;
                }
                Some(self.habit_loop.apply(
                    state,
                    &report,
                    primary,
                    Box::new(move |resolved: &HabitState| {
                        selector
                            .select(scores, rating, Some(resolved))
                            .primary()
                            .filter(|next| !resolved.is_resolved(*next))
                            .map(|next| (next, baseline(scores)))
                    }),
                ))
            })
            .await?;

        if let Some(t) = &transition {
            info!(
                user_id,
                game_id = %game_id,
                bucket = t.bucket.map(|b| b.as_str()),
                intensity_before = t.intensity_before.level(),
                intensity_after = t.intensity_after.level(),
                "Game audited"
            );
        }

        Ok(AuditOutcome::Audited {
            report,
            transition,
            replayed: false,
        })
    }

    /// The bucket currently costing the user the most.
    #[instrument(skip(self))]
    pub async fn get_dominant_weakness(&self, user_id: &str) -> DomainResult<WeaknessReport> {
        let analyzed_games = self.analysis.count_games(user_id).await?;
        if analyzed_games < self.scoring().min_games {
            return Ok(WeaknessReport::NeedsMoreGames {
                analyzed_games,
                required: self.scoring().min_games,
            });
        }

        let window = self.window(user_id).await?;
        let state = self.store.load_habit_state(user_id).await?;
        let selection = self
            .selector
            .select(&window.snapshot.scores, window.rating, state.as_ref());

        let WeaknessSelection::Selected { primary, secondary } = selection else {
            return Ok(WeaknessReport::AllClear {
                streak: state.map_or(0, |s| s.streak),
            });
        };

        let evidence = window
            .snapshot
            .events
            .iter()
            .filter(|e| e.bucket == primary.bucket)
            .map(|e| GameEvidence {
                game_id: e.game_id.clone(),
                evidence: e.evidence(),
            })
            .collect();
        let baseline_cost = state
            .as_ref()
            .filter(|s| s.active_bucket == Some(primary.bucket))
            .and_then(|s| s.baseline_cost(primary.bucket));

        Ok(WeaknessReport::Dominant {
            bucket: primary.bucket,
            cost_score: primary.score,
            secondary: secondary.map(|s| s.bucket),
            evidence,
            baseline_cost,
        })
    }

    /// Record a self-report against a bucket.
    #[instrument(skip(self))]
    pub async fn record_reflection(&self, user_id: &str, bucket_hint: &str) -> DomainResult<Reflection> {
        let bucket = Bucket::from_str(bucket_hint)
            .ok_or_else(|| DomainError::UnknownBucket(bucket_hint.to_string()))?;
        let reflection = Reflection::new(user_id, bucket);
        self.store.record_reflection(&reflection).await?;
        self.cache.invalidate(user_id).await;
        info!(user_id, bucket = bucket.as_str(), "Reflection recorded");
        Ok(reflection)
    }

    /// Drop cached scores after the analysis source gains a game.
    pub async fn on_game_analyzed(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
        debug!(user_id, "Score cache invalidated");
    }

    pub async fn plan_history(&self, user_id: &str, limit: usize) -> DomainResult<Vec<Plan>> {
        self.store.plan_history(user_id, limit).await
    }

    pub async fn habit_state(&self, user_id: &str) -> DomainResult<Option<HabitState>> {
        self.store.load_habit_state(user_id).await
    }

    /// Load the window and its scores, reusing the cache when the inputs match.
    async fn window(&self, user_id: &str) -> DomainResult<Window> {
        let window_games = self.scoring().window_games;
        let games = self
            .analysis
            .recent_games(user_id, window_games.max(self.opening_stats_games))
            .await?;
        let scored = &games[..games.len().min(window_games)];

        let rating = match self.analysis.user_rating(user_id).await? {
            Some(rating) => Some(rating),
            None => games.first().and_then(|g| g.meta.user_rating),
        };
        let tier = RatingTier::from_rating(rating);

        let reflections = match scored.last() {
            Some(oldest) => {
                self.store
                    .reflections_since(user_id, oldest.meta.played_at)
                    .await?
            }
            None => Vec::new(),
        };

        let fingerprint = WindowFingerprint {
            game_ids: scored.iter().map(|g| g.game_id().to_string()).collect(),
            tier,
            reflections: reflections.len(),
        };

        let snapshot = match self.cache.get(user_id, &fingerprint).await {
            Some(snapshot) => snapshot,
            None => {
                let (events, report) = self.extractor.extract_window(scored, tier);
                let mut counts: BTreeMap<Bucket, usize> = BTreeMap::new();
                for reflection in &reflections {
                    *counts.entry(reflection.bucket).or_default() += 1;
                }
                let scores = self.scorer.score(&events, &counts);
                self.cache
                    .insert(
                        user_id,
                        ScoreSnapshot {
                            fingerprint,
                            events,
                            report,
                            scores,
                        },
                    )
                    .await
            }
        };

        Ok(Window {
            games,
            rating,
            snapshot,
        })
    }

    /// Read-modify-write on habit state with compare-and-swap retries.
    ///
    /// `update` returns `None` when nothing needs saving.
    async fn update_habit_state<T, F>(&self, user_id: &str, mut update: F) -> DomainResult<(HabitState, Option<T>)>
    where
        F: FnMut(&mut HabitState) -> Option<T>,
    {
        let max_retries = self.store_config.max_update_retries;
        let mut attempt = 0;
        loop {
            let mut state = self
                .store
                .load_habit_state(user_id)
                .await?
                .unwrap_or_else(|| HabitState::new(user_id, self.initial_intensity));

            let Some(value) = update(&mut state) else {
                return Ok((state, None));
            };

            match self.store.save_habit_state(&state).await {
                Ok(saved) => {
                    if attempt > 0 {
                        debug!(user_id, attempts = attempt + 1, "Habit state saved after conflict retry");
                    }
                    return Ok((saved, Some(value)));
                }
                Err(e) if e.is_conflict() && attempt < max_retries => {
                    debug!(user_id, attempt = attempt + 1, max_retries, "Habit state conflict, retrying with fresh state");
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        user_id,
                        bucket = state.active_bucket.map(|b| b.as_str()),
                        game_id = state.last_audited_game_id.as_deref(),
                        error = %e,
                        "Failed to save habit state"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Whether habit state already reflects `game_id` or a newer game.
///
/// `games` is newest first.
fn already_applied(state: &HabitState, game_id: &str, games: &[AnalyzedGame]) -> bool {
    let Some(last) = state.last_audited_game_id.as_deref() else {
        return false;
    };
    if last == game_id {
        return true;
    }
    let position = |id: &str| games.iter().position(|g| g.game_id() == id);
    matches!((position(last), position(game_id)), (Some(last), Some(this)) if last < this)
}

fn baseline(scores: &[CostScore]) -> BaselineSnapshot {
    BaselineSnapshot {
        taken_at: Utc::now(),
        costs: scores.iter().map(|s| (s.bucket, s.value)).collect(),
    }
}

async fn backoff(attempt: u32) {
    tokio::time::sleep(tokio::time::Duration::from_millis(10 * (u64::from(attempt) + 1))).await;
}
