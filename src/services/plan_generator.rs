//! Plan generator.
//!
//! Builds the next [`Plan`] from the selected focus, intensity and the
//! user's recent games. Generation is pure; persisting the plan and moving
//! the current pointer is the service's job.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{
    AnalyzedGame, AuditReport, AuditStatus, Bucket, Color, DomainCard, ExamplePosition,
    FocusItem, Intensity, MistakeEvent, OpeningRecommendation, Plan, PlanConfig, PlanDomain,
    PlanRule, RatingTier, RuleKind,
};
use crate::services::rule_table::{RuleKey, RuleTable};
use crate::services::weakness_selector::WeaknessSelector;

/// Everything the generator needs for one plan.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub user_id: &'a str,
    pub primary: Bucket,
    pub secondary: Option<Bucket>,
    pub rating: Option<u32>,
    pub intensity: Intensity,
    /// Recent games, newest first. Used for opening statistics.
    pub games: &'a [AnalyzedGame],
    /// Mistake events from the scoring window
    pub events: &'a [MistakeEvent],
    pub previous_audit: Option<&'a AuditReport>,
    pub supersedes: Option<Uuid>,
}

/// Opening family: the name up to the first `:` (variation dropped).
pub fn opening_family(name: &str) -> &str {
    name.split(':').next().unwrap_or(name).trim()
}

pub struct PlanGenerator {
    config: PlanConfig,
    rules: RuleTable,
    selector: WeaknessSelector,
}

impl PlanGenerator {
    pub fn new(config: PlanConfig, rules: RuleTable, selector: WeaknessSelector) -> Self {
        Self {
            config,
            rules,
            selector,
        }
    }

    pub fn rule_table(&self) -> &RuleTable {
        &self.rules
    }

    pub fn generate(&self, request: &PlanRequest<'_>) -> Plan {
        let tier = RatingTier::from_rating(request.rating);
        let opening_recommendations = self.opening_recommendations(request.games);
        let next_color = request
            .games
            .first()
            .map_or(Color::White, |g| g.meta.user_color.opposite());
        let required_opening = opening_recommendations
            .iter()
            .find(|r| r.color() == next_color)
            .and_then(|r| r.opening().map(str::to_string));

        let domains: Vec<DomainCard> = PlanDomain::ALL
            .into_iter()
            .map(|domain| self.card(request, domain, tier, required_opening.as_deref()))
            .collect();
        let rules: Vec<PlanRule> = domains.iter().filter_map(|c| c.rule.clone()).collect();

        let plan = Plan {
            plan_id: Uuid::new_v4(),
            user_id: request.user_id.to_string(),
            created_at: Utc::now(),
            primary_focus: request.primary,
            secondary_focus: request.secondary,
            rating_tier: tier,
            focus_items: self.focus_items(request.previous_audit, &domains),
            domains,
            intensity: request.intensity,
            rules,
            opening_recommendations,
            example_positions: self.example_positions(request.primary, request.events),
            based_on_game_id: request
                .games
                .first()
                .map(|g| g.game_id().to_string())
                .unwrap_or_default(),
            supersedes: request.supersedes,
            rule_table_version: self.rules.version.clone(),
        };

        debug!(
            user_id = %plan.user_id,
            plan_id = %plan.plan_id,
            primary = plan.primary_focus.as_str(),
            intensity = plan.intensity.level(),
            rules = plan.rules.len(),
            "Generated plan"
        );
        plan
    }

    /// Whether a domain's card carries an audited rule.
    fn carries_rule(&self, request: &PlanRequest<'_>, domain: PlanDomain) -> bool {
        let primary = request.primary.domain() == domain;
        let secondary = request.secondary.is_some_and(|b| b.domain() == domain);
        match request.intensity.level() {
            5 => primary,
            4 => primary || secondary,
            _ => {
                primary
                    || domain
                        .buckets()
                        .into_iter()
                        .any(|b| self.selector.is_eligible(b, request.rating))
            }
        }
    }

    fn card(
        &self,
        request: &PlanRequest<'_>,
        domain: PlanDomain,
        tier: RatingTier,
        required_opening: Option<&str>,
    ) -> DomainCard {
        let habit = [Some(request.primary), request.secondary]
            .into_iter()
            .flatten()
            .find(|b| b.domain() == domain)
            .unwrap_or_else(|| domain.home_bucket());

        let rendered = self.rules.lookup(RuleKey {
            domain,
            habit,
            tier,
            intensity: request.intensity,
        });
        let Some(rendered) = rendered else {
            return DomainCard {
                domain,
                goal: domain.display_name().to_string(),
                bullets: Vec::new(),
                rule: None,
            };
        };

        if !self.carries_rule(request, domain) {
            return DomainCard {
                domain,
                goal: rendered.goal,
                bullets: Vec::new(),
                rule: None,
            };
        }

        let kind = match domain {
            PlanDomain::Opening => RuleKind::FollowOpeningPlan,
            PlanDomain::AdvantageDiscipline => RuleKind::NoBlunderWhileAhead,
            _ => RuleKind::AvoidErrors,
        };
        let required_opening = match kind {
            RuleKind::FollowOpeningPlan => required_opening.map(str::to_string),
            _ => None,
        };

        DomainCard {
            domain,
            goal: rendered.goal,
            bullets: rendered.bullets,
            rule: Some(PlanRule {
                domain,
                habit,
                kind,
                text: rendered.rule_text,
                required_opening,
            }),
        }
    }

    /// Best-scoring opening family per colour.
    ///
    /// Families need `min_opening_games` games to qualify. Ties go to the
    /// family with more games, then the lexically smaller name.
    pub fn opening_recommendations(&self, games: &[AnalyzedGame]) -> Vec<OpeningRecommendation> {
        [Color::White, Color::Black]
            .into_iter()
            .map(|color| {
                let mut stats: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
                for game in games
                    .iter()
                    .take(self.config.opening_stats_games)
                    .filter(|g| g.meta.user_color == color)
                {
                    let Some(name) = game.meta.opening_name.as_deref() else {
                        continue;
                    };
                    let family = opening_family(name);
                    if family.is_empty() {
                        continue;
                    }
                    let entry = stats.entry(family).or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += game.meta.result.points();
                }

                let best = stats
                    .into_iter()
                    .filter(|(_, (count, _))| *count >= self.config.min_opening_games)
                    .map(|(name, (count, points))| (name, count, points / count as f64))
                    .fold(None::<(&str, usize, f64)>, |best, candidate| match best {
                        None => Some(candidate),
                        Some(current) => {
                            let better_rate = candidate.2 > current.2 + 1e-9;
                            let same_rate = (candidate.2 - current.2).abs() <= 1e-9;
                            // BTreeMap iteration is lexical, so the incumbent wins full ties
                            if better_rate || (same_rate && candidate.1 > current.1) {
                                Some(candidate)
                            } else {
                                Some(current)
                            }
                        }
                    });

                match best {
                    Some((opening, games, score_rate)) => OpeningRecommendation::Recommended {
                        color,
                        opening: opening.to_string(),
                        games,
                        score_rate,
                    },
                    None => OpeningRecommendation::InsufficientData { color },
                }
            })
            .collect()
    }

    /// The primary bucket's costliest positions.
    pub fn example_positions(&self, primary: Bucket, events: &[MistakeEvent]) -> Vec<ExamplePosition> {
        let mut matching: Vec<&MistakeEvent> =
            events.iter().filter(|e| e.bucket == primary).collect();
        matching.sort_by(|a, b| {
            b.cp_loss
                .cmp(&a.cp_loss)
                .then_with(|| a.game_id.cmp(&b.game_id))
                .then_with(|| a.move_number.cmp(&b.move_number))
        });
        matching
            .into_iter()
            .take(self.config.max_example_positions)
            .map(|e| ExamplePosition {
                game_id: e.game_id.clone(),
                move_number: e.move_number,
                fen: e.fen.clone(),
                played_move: e.played_move.clone(),
                best_move: e.best_move.clone(),
                cp_loss: e.cp_loss,
            })
            .collect()
    }

    /// Reminders for domains the last audit found partial or missed.
    fn focus_items(&self, previous: Option<&AuditReport>, cards: &[DomainCard]) -> Vec<FocusItem> {
        let Some(report) = previous else {
            return Vec::new();
        };
        report
            .results
            .iter()
            .filter(|r| matches!(r.status, AuditStatus::Partial | AuditStatus::Missed))
            .map(|r| {
                let goal = cards
                    .iter()
                    .find(|c| c.domain == r.domain)
                    .map_or(r.domain.display_name(), |c| c.goal.as_str());
                FocusItem {
                    domain: r.domain,
                    text: format!("{} last game: {goal}", r.status.as_str()),
                    from_last_game: true,
                    source_game_id: r.game_id.clone(),
                    move_number: r.evidence.first().map(|e| e.move_number),
                }
            })
            .collect()
    }
}
