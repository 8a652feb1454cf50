//! Coaching plan domain model.
//!
//! A plan is immutable once created. The next plan supersedes it through the
//! store's current pointer; past plans stay in history untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::habit::Intensity;
use super::taxonomy::{Bucket, Color, PlanDomain, RatingTier};

/// What a rule asks the user to do, and therefore how it is audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Avoid errors in the named buckets
    AvoidErrors,
    /// Avoid any serious error while the position is winning
    NoBlunderWhileAhead,
    /// Avoid opening errors and play the recommended opening
    FollowOpeningPlan,
}

/// A rule attached to a plan card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRule {
    pub domain: PlanDomain,
    /// Micro-habit the rule text was selected for
    pub habit: Bucket,
    pub kind: RuleKind,
    pub text: String,
    /// Opening the user is expected to play, for `FollowOpeningPlan`
    #[serde(default)]
    pub required_opening: Option<String>,
}

/// One of the five per-domain cards on a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCard {
    pub domain: PlanDomain,
    pub goal: String,
    /// At most four bullets, highest priority first
    pub bullets: Vec<String>,
    /// The rule audited for this domain; `None` means the domain is n/a
    pub rule: Option<PlanRule>,
}

/// Opening guidance for one colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpeningRecommendation {
    Recommended {
        color: Color,
        opening: String,
        games: usize,
        /// Points per game, draws counted as half
        score_rate: f64,
    },
    InsufficientData {
        color: Color,
    },
}

impl OpeningRecommendation {
    pub fn color(&self) -> Color {
        match self {
            Self::Recommended { color, .. } | Self::InsufficientData { color } => *color,
        }
    }

    pub fn opening(&self) -> Option<&str> {
        match self {
            Self::Recommended { opening, .. } => Some(opening),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// A position from the user's own games illustrating the primary weakness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePosition {
    pub game_id: String,
    pub move_number: u32,
    pub fen: String,
    pub played_move: Option<String>,
    pub best_move: Option<String>,
    pub cp_loss: i32,
}

/// A reminder carried over from the previous audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusItem {
    pub domain: PlanDomain,
    pub text: String,
    pub from_last_game: bool,
    pub source_game_id: String,
    pub move_number: Option<u32>,
}

/// Structured guidance for the user's next game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub primary_focus: Bucket,
    pub secondary_focus: Option<Bucket>,
    pub rating_tier: RatingTier,
    /// Exactly five cards, in `PlanDomain::ALL` order
    pub domains: Vec<DomainCard>,
    pub intensity: Intensity,
    pub rules: Vec<PlanRule>,
    pub opening_recommendations: Vec<OpeningRecommendation>,
    pub example_positions: Vec<ExamplePosition>,
    pub focus_items: Vec<FocusItem>,
    /// Latest analyzed game at generation time
    pub based_on_game_id: String,
    /// Plan this one replaced as current
    pub supersedes: Option<Uuid>,
    pub rule_table_version: String,
}

impl Plan {
    pub fn card(&self, domain: PlanDomain) -> Option<&DomainCard> {
        self.domains.iter().find(|card| card.domain == domain)
    }

    pub fn rule_for(&self, domain: PlanDomain) -> Option<&PlanRule> {
        self.card(domain).and_then(|card| card.rule.as_ref())
    }
}

/// `get_current_plan` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlanOutcome {
    Ready { plan: Box<Plan>, regenerated: bool },
    NeedsMoreGames { analyzed_games: usize, required: usize },
    AllClear { streak: u32 },
}
