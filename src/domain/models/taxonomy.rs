//! Coaching taxonomy.
//!
//! One canonical set of seven behavioral buckets, projected onto the five
//! fixed plan domains that every plan card and audit row is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A behavioral weakness category that mistakes are scored under.
///
/// Declaration order is the stable lexical order used as the final
/// tie-break in weakness selection; it matches the ordering of `as_str()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    AdvantageDiscipline,
    EndgameFundamentals,
    OpeningStability,
    PieceSafety,
    TacticalExecution,
    ThreatAwareness,
    TimeDiscipline,
}

impl Bucket {
    /// All buckets in lexical id order.
    pub const ALL: [Self; 7] = [
        Self::AdvantageDiscipline,
        Self::EndgameFundamentals,
        Self::OpeningStability,
        Self::PieceSafety,
        Self::TacticalExecution,
        Self::ThreatAwareness,
        Self::TimeDiscipline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdvantageDiscipline => "advantage_discipline",
            Self::EndgameFundamentals => "endgame_fundamentals",
            Self::OpeningStability => "opening_stability",
            Self::PieceSafety => "piece_safety",
            Self::TacticalExecution => "tactical_execution",
            Self::ThreatAwareness => "threat_awareness",
            Self::TimeDiscipline => "time_discipline",
        }
    }

    /// Parse a bucket id. Accepts `snake_case`, kebab-case and spaced forms.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "advantage_discipline" => Some(Self::AdvantageDiscipline),
            "endgame_fundamentals" => Some(Self::EndgameFundamentals),
            "opening_stability" => Some(Self::OpeningStability),
            "piece_safety" => Some(Self::PieceSafety),
            "tactical_execution" => Some(Self::TacticalExecution),
            "threat_awareness" => Some(Self::ThreatAwareness),
            "time_discipline" => Some(Self::TimeDiscipline),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AdvantageDiscipline => "Advantage Discipline",
            Self::EndgameFundamentals => "Endgame Fundamentals",
            Self::OpeningStability => "Opening Stability",
            Self::PieceSafety => "Piece Safety",
            Self::TacticalExecution => "Tactical Execution",
            Self::ThreatAwareness => "Threat Awareness",
            Self::TimeDiscipline => "Time Discipline",
        }
    }

    /// The plan domain whose card carries this bucket's rules.
    pub fn domain(&self) -> PlanDomain {
        match self {
            Self::OpeningStability => PlanDomain::Opening,
            Self::PieceSafety | Self::ThreatAwareness | Self::TimeDiscipline => PlanDomain::Safety,
            Self::TacticalExecution => PlanDomain::Tactics,
            Self::AdvantageDiscipline => PlanDomain::AdvantageDiscipline,
            Self::EndgameFundamentals => PlanDomain::Endgame,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One of the five fixed plan domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDomain {
    Opening,
    Safety,
    Tactics,
    AdvantageDiscipline,
    Endgame,
}

impl PlanDomain {
    /// Card order on every plan.
    pub const ALL: [Self; 5] = [
        Self::Opening,
        Self::Safety,
        Self::Tactics,
        Self::AdvantageDiscipline,
        Self::Endgame,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Safety => "safety",
            Self::Tactics => "tactics",
            Self::AdvantageDiscipline => "advantage_discipline",
            Self::Endgame => "endgame",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "opening" => Some(Self::Opening),
            "safety" => Some(Self::Safety),
            "tactics" => Some(Self::Tactics),
            "advantage_discipline" => Some(Self::AdvantageDiscipline),
            "endgame" => Some(Self::Endgame),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Safety => "Safety",
            Self::Tactics => "Tactics",
            Self::AdvantageDiscipline => "Advantage Discipline",
            Self::Endgame => "Endgame",
        }
    }

    /// Buckets projected onto this domain, in lexical order.
    pub fn buckets(&self) -> Vec<Bucket> {
        Bucket::ALL
            .into_iter()
            .filter(|bucket| bucket.domain() == *self)
            .collect()
    }

    /// The bucket used for this domain's rule text when the focus lies elsewhere.
    pub fn home_bucket(&self) -> Bucket {
        match self {
            Self::Opening => Bucket::OpeningStability,
            Self::Safety => Bucket::PieceSafety,
            Self::Tactics => Bucket::TacticalExecution,
            Self::AdvantageDiscipline => Bucket::AdvantageDiscipline,
            Self::Endgame => Bucket::EndgameFundamentals,
        }
    }
}

impl fmt::Display for PlanDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Game phase a move was played in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Middlegame => "middlegame",
            Self::Endgame => "endgame",
        }
    }
}

/// Error severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        }
    }

    /// Map an upstream classification label. Non-error labels return `None`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inaccuracy" | "dubious" | "?!" => Some(Self::Inaccuracy),
            "mistake" | "?" => Some(Self::Mistake),
            "blunder" | "??" => Some(Self::Blunder),
            _ => None,
        }
    }
}

/// Evaluation state before the move, from the user's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinState {
    Losing,
    Equal,
    Winning,
}

impl WinState {
    /// Classify a user-relative evaluation against a symmetric equal band.
    pub fn classify(eval_before_cp: i32, equal_band_cp: i32) -> Self {
        if eval_before_cp > equal_band_cp {
            Self::Winning
        } else if eval_before_cp < -equal_band_cp {
            Self::Losing
        } else {
            Self::Equal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Losing => "losing",
            Self::Equal => "equal",
            Self::Winning => "winning",
        }
    }
}

/// Rating tier used to key phase thresholds and rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingTier {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl RatingTier {
    pub const ALL: [Self; 4] = [Self::Beginner, Self::Intermediate, Self::Advanced, Self::Expert];

    /// Tier for a rating. Unknown ratings are treated as Intermediate.
    pub fn from_rating(rating: Option<u32>) -> Self {
        match rating {
            Some(r) if r < 1000 => Self::Beginner,
            Some(r) if r < 1600 => Self::Intermediate,
            Some(r) if r < 2000 => Self::Advanced,
            Some(_) => Self::Expert,
            None => Self::Intermediate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    /// The next tier down, if any.
    pub fn lower(&self) -> Option<Self> {
        match self {
            Self::Beginner => None,
            Self::Intermediate => Some(Self::Beginner),
            Self::Advanced => Some(Self::Intermediate),
            Self::Expert => Some(Self::Advanced),
        }
    }
}

/// Piece colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "white" | "w" => Some(Self::White),
            "black" | "b" => Some(Self::Black),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}
