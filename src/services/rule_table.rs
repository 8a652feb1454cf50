//! Versioned rule-text table.
//!
//! Plan text is looked up by `[domain][micro_habit][rating_tier][intensity]`.
//! The table holds per-tier entries; a missing tier falls back to the nearest
//! lower tier, and a missing habit falls back to the domain's maintenance
//! text. Intensity selects how many bullets survive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{Bucket, Intensity, PlanDomain, RatingTier};

/// Version stamped on plans generated from the built-in table.
pub const BUILTIN_RULE_TABLE_VERSION: &str = "builtin-3";

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("Failed to read rule table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Rule table has no entry for domain {0}")]
    MissingDomain(PlanDomain),

    #[error("Rule table lists {bucket} under {domain}, but it belongs to {expected}")]
    MisplacedHabit {
        bucket: Bucket,
        domain: PlanDomain,
        expected: PlanDomain,
    },

    #[error("Rule text for {0} has no bullets")]
    EmptyBullets(String),
}

/// Text for one table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleText {
    pub goal: String,
    /// Highest priority first
    pub bullets: Vec<String>,
    /// The single whole-game rule used at intensity 5
    pub critical: String,
}

/// Rules for one plan domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRules {
    /// Used when the domain's card is not tied to a focus habit
    pub maintenance: RuleText,
    #[serde(default)]
    pub habits: BTreeMap<Bucket, BTreeMap<RatingTier, RuleText>>,
}

/// Lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleKey {
    pub domain: PlanDomain,
    pub habit: Bucket,
    pub tier: RatingTier,
    pub intensity: Intensity,
}

/// Text selected for a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRule {
    pub goal: String,
    pub bullets: Vec<String>,
    /// The statement the audit holds the user to
    pub rule_text: String,
    /// False when the maintenance text was used
    pub habit_specific: bool,
}

/// The full rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub version: String,
    pub domains: BTreeMap<PlanDomain, DomainRules>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Bullets shown on a card at each intensity.
pub fn bullets_for_intensity(intensity: Intensity) -> usize {
    match intensity.level() {
        1 => 4,
        2 => 3,
        3 => 2,
        _ => 1,
    }
}

impl RuleTable {
    /// Load and validate a YAML table.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RuleTableError> {
        let table: Self = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleTableError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), RuleTableError> {
        for domain in PlanDomain::ALL {
            let rules = self
                .domains
                .get(&domain)
                .ok_or(RuleTableError::MissingDomain(domain))?;
            if rules.maintenance.bullets.is_empty() {
                return Err(RuleTableError::EmptyBullets(format!("{domain} maintenance")));
            }
            for (bucket, tiers) in &rules.habits {
                if bucket.domain() != domain {
                    return Err(RuleTableError::MisplacedHabit {
                        bucket: *bucket,
                        domain,
                        expected: bucket.domain(),
                    });
                }
                for (tier, text) in tiers {
                    if text.bullets.is_empty() {
                        return Err(RuleTableError::EmptyBullets(format!(
                            "{domain}/{}/{}",
                            bucket.as_str(),
                            tier.as_str()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up the text for a card. `None` only if the domain is absent.
    pub fn lookup(&self, key: RuleKey) -> Option<RenderedRule> {
        let rules = self.domains.get(&key.domain)?;

        let specific = rules.habits.get(&key.habit).and_then(|tiers| {
            let mut tier = Some(key.tier);
            while let Some(t) = tier {
                if let Some(text) = tiers.get(&t) {
                    return Some(text);
                }
                tier = t.lower();
            }
            None
        });

        let (text, habit_specific) = match specific {
            Some(text) => (text, true),
            None => (&rules.maintenance, false),
        };

        let (bullets, rule_text) = if key.intensity == Intensity::MAX {
            (vec![text.critical.clone()], text.critical.clone())
        } else {
            let bullets: Vec<String> = text
                .bullets
                .iter()
                .take(bullets_for_intensity(key.intensity))
                .cloned()
                .collect();
            let rule_text = bullets.first().cloned().unwrap_or_default();
            (bullets, rule_text)
        };

        Some(RenderedRule {
            goal: text.goal.clone(),
            bullets,
            rule_text,
            habit_specific,
        })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut domains = BTreeMap::new();

        domains.insert(
            PlanDomain::Opening,
            DomainRules {
                maintenance: text(
                    "Reach a playable middlegame",
                    &[
                        "Develop a new piece each move until castled",
                        "Castle before move 10",
                        "Move each piece once before moving one twice",
                        "Fight for the centre with pawns",
                    ],
                    "Castle before starting any attack",
                ),
                habits: habit(
                    Bucket::OpeningStability,
                    text(
                        "Stay on book and get castled",
                        &[
                            "Play your recommended opening",
                            "Before leaving theory, check every piece is defended",
                            "Do not grab pawns before you have castled",
                            "No queen moves before move 6",
                        ],
                        "Play the recommended opening and castle",
                    ),
                    text(
                        "Stay inside your repertoire",
                        &[
                            "Play your recommended opening",
                            "When the opponent deviates, spend time on the first new move",
                            "Know the pawn structure you are aiming for",
                            "Compare every early pawn grab against king safety",
                        ],
                        "Play the recommended opening and think at the first deviation",
                    ),
                ),
            },
        );

        let mut safety_habits = habit(
            Bucket::PieceSafety,
            text(
                "Keep every piece defended",
                &[
                    "Before each move, ask what your piece can be taken by",
                    "Count attackers and defenders before leaving a piece",
                    "Check the square your piece lands on",
                    "If unsure, move the piece back to safety",
                ],
                "Ask 'is it safe?' before every move",
            ),
            text(
                "No loose pieces",
                &[
                    "Blunder-check every move: captures, checks, threats",
                    "Keep pieces protected when the position opens",
                    "Re-check piece safety after every exchange",
                    "Look for x-ray and discovered attacks on your pieces",
                ],
                "Blunder-check every move before touching a piece",
            ),
        );
        safety_habits.extend(habit(
            Bucket::ThreatAwareness,
            text(
                "See the opponent's threat",
                &[
                    "After each opponent move, ask what it threatens",
                    "Look at checks and captures the opponent has next move",
                    "Answer the threat before making your own plan",
                    "Watch pieces that line up with your king",
                ],
                "Name the opponent's threat before every move",
            ),
            text(
                "Respect the opponent's ideas",
                &[
                    "Find the opponent's best reply before committing",
                    "Check prophylaxis before expanding",
                    "Track which of your squares are weak",
                    "Re-evaluate threats after every capture",
                ],
                "Find the opponent's best reply before every move",
            ),
        ));
        safety_habits.extend(habit(
            Bucket::TimeDiscipline,
            text(
                "Keep time for the critical moments",
                &[
                    "Keep at least a third of your time after move 20",
                    "Play simple developing moves quickly",
                    "Spend time only when captures or checks are on the board",
                    "With under a minute, play safe moves, not tricks",
                ],
                "Never drop below one minute without a safe plan",
            ),
            text(
                "Budget the clock",
                &[
                    "Set a time checkpoint at move 20 and move 30",
                    "Use your time on critical decisions, not routine moves",
                    "In time trouble, keep pieces defended first",
                    "Pre-decide candidate moves while the opponent thinks",
                ],
                "Keep a clock reserve for the critical moment",
            ),
        ));
        domains.insert(
            PlanDomain::Safety,
            DomainRules {
                maintenance: text(
                    "Stay solid",
                    &[
                        "Check captures and checks for both sides each move",
                        "Keep your king covered",
                        "Defend loose pieces before attacking",
                        "Take an extra look before every capture",
                    ],
                    "Blunder-check every move",
                ),
                habits: safety_habits,
            },
        );

        domains.insert(
            PlanDomain::Tactics,
            DomainRules {
                maintenance: text(
                    "Take your chances",
                    &[
                        "Look for checks, captures and threats for yourself",
                        "Check if an opponent piece is undefended",
                        "Calculate forcing moves to the end",
                        "Look for forks on the king and queen",
                    ],
                    "Check every forcing move before a quiet one",
                ),
                habits: habit(
                    Bucket::TacticalExecution,
                    text(
                        "Spot the tactic",
                        &[
                            "Every move, list your checks and captures first",
                            "Look for undefended opponent pieces",
                            "Try forks, pins and skewers on the king and queen",
                            "Count material at the end of a sequence",
                        ],
                        "List every check and capture before moving",
                    ),
                    text(
                        "Calculate forcing lines",
                        &[
                            "Checks, captures, threats: in that order, every move",
                            "Calculate forcing lines to a quiet position",
                            "Look for the opponent's in-between moves",
                            "Verify the final position before starting the sequence",
                        ],
                        "Calculate every forcing line before a quiet move",
                    ),
                ),
            },
        );

        domains.insert(
            PlanDomain::AdvantageDiscipline,
            DomainRules {
                maintenance: text(
                    "Convert advantages",
                    &[
                        "When ahead, trade pieces, not pawns",
                        "Do not blunder while ahead",
                        "Keep your king safe while winning",
                        "Choose the simplest winning line",
                    ],
                    "Do not blunder while ahead",
                ),
                habits: habit(
                    Bucket::AdvantageDiscipline,
                    text(
                        "Do not blunder while ahead",
                        &[
                            "Do not blunder while ahead: check every move twice",
                            "When ahead, trade pieces",
                            "Prefer safe moves over flashy ones",
                            "Stop attacking if it leaves pieces loose",
                        ],
                        "Do not blunder while ahead",
                    ),
                    text(
                        "Convert cleanly",
                        &[
                            "Do not blunder while ahead: look for counterplay first",
                            "Simplify into a winning endgame",
                            "Limit the opponent's active pieces before pushing",
                            "Spend time when the position is winning",
                        ],
                        "Do not blunder while ahead",
                    ),
                ),
            },
        );

        domains.insert(
            PlanDomain::Endgame,
            DomainRules {
                maintenance: text(
                    "Play the endgame actively",
                    &[
                        "Activate your king when queens are off",
                        "Push passed pawns",
                        "Put rooks behind passed pawns",
                        "Count pawn races before entering them",
                    ],
                    "Activate the king once queens are off",
                ),
                habits: habit(
                    Bucket::EndgameFundamentals,
                    text(
                        "Know the basic endgames",
                        &[
                            "Bring the king to the centre once queens are off",
                            "Push passed pawns with king support",
                            "Keep rooks active",
                            "Check for stalemate before every move when ahead",
                        ],
                        "King to the centre once queens are off",
                    ),
                    text(
                        "Technique over tricks",
                        &[
                            "Activate the king before pushing pawns",
                            "Rooks behind passed pawns",
                            "Calculate pawn races precisely",
                            "Know the opposition in king and pawn endings",
                        ],
                        "Activate the king before every pawn push",
                    ),
                ),
            },
        );

        Self {
            version: BUILTIN_RULE_TABLE_VERSION.to_string(),
            domains,
        }
    }
}

fn text(goal: &str, bullets: &[&str], critical: &str) -> RuleText {
    RuleText {
        goal: goal.to_string(),
        bullets: bullets.iter().map(|b| (*b).to_string()).collect(),
        critical: critical.to_string(),
    }
}

/// Entries for a habit: Beginner text and Advanced text.
fn habit(
    bucket: Bucket,
    beginner: RuleText,
    advanced: RuleText,
) -> BTreeMap<Bucket, BTreeMap<RatingTier, RuleText>> {
    let tiers = BTreeMap::from([(RatingTier::Beginner, beginner), (RatingTier::Advanced, advanced)]);
    BTreeMap::from([(bucket, tiers)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(domain: PlanDomain, habit: Bucket, tier: RatingTier, level: u8) -> RuleKey {
        RuleKey {
            domain,
            habit,
            tier,
            intensity: Intensity::new(level).unwrap(),
        }
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = RuleTable::builtin();
        table.validate().unwrap();
        for bucket in Bucket::ALL {
            let rules = &table.domains[&bucket.domain()];
            assert!(rules.habits.contains_key(&bucket), "no rules for {bucket}");
        }
    }

    #[test]
    fn test_intensity_collapses_bullets() {
        let table = RuleTable::builtin();
        let counts: Vec<usize> = (1..=5)
            .map(|level| {
                table
                    .lookup(key(PlanDomain::Safety, Bucket::PieceSafety, RatingTier::Beginner, level))
                    .unwrap()
                    .bullets
                    .len()
            })
            .collect();
        assert_eq!(counts, vec![4, 3, 2, 1, 1]);

        let critical = table
            .lookup(key(PlanDomain::Safety, Bucket::PieceSafety, RatingTier::Beginner, 5))
            .unwrap();
        assert_eq!(critical.rule_text, "Ask 'is it safe?' before every move");
    }

    #[test]
    fn test_tier_falls_back_to_lower_tier() {
        let table = RuleTable::builtin();
        let intermediate = table
            .lookup(key(PlanDomain::Tactics, Bucket::TacticalExecution, RatingTier::Intermediate, 1))
            .unwrap();
        let beginner = table
            .lookup(key(PlanDomain::Tactics, Bucket::TacticalExecution, RatingTier::Beginner, 1))
            .unwrap();
        assert_eq!(intermediate, beginner);

        let expert = table
            .lookup(key(PlanDomain::Tactics, Bucket::TacticalExecution, RatingTier::Expert, 1))
            .unwrap();
        assert_eq!(expert.goal, "Calculate forcing lines");
    }

    #[test]
    fn test_unknown_habit_uses_maintenance() {
        let table = RuleTable::builtin();
        let rendered = table
            .lookup(key(PlanDomain::Endgame, Bucket::PieceSafety, RatingTier::Advanced, 2))
            .unwrap();
        assert!(!rendered.habit_specific);
        assert_eq!(rendered.goal, "Play the endgame actively");
    }

    #[test]
    fn test_higher_tier_only_uses_maintenance() {
        let mut table = RuleTable::builtin();
        let tactics = table.domains.get_mut(&PlanDomain::Tactics).unwrap();
        let tiers = tactics.habits.get_mut(&Bucket::TacticalExecution).unwrap();
        tiers.remove(&RatingTier::Beginner);

        let rendered = table
            .lookup(key(PlanDomain::Tactics, Bucket::TacticalExecution, RatingTier::Intermediate, 1))
            .unwrap();
        assert!(!rendered.habit_specific);
        assert_eq!(rendered.goal, table.domains[&PlanDomain::Tactics].maintenance.goal);

        let advanced = table
            .lookup(key(PlanDomain::Tactics, Bucket::TacticalExecution, RatingTier::Expert, 1))
            .unwrap();
        assert!(advanced.habit_specific);
    }

    #[test]
    fn test_yaml_round_trip() {
        let table = RuleTable::builtin();
        let yaml = serde_yaml::to_string(&table).unwrap();
        let parsed = RuleTable::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_yaml_rejects_misplaced_habit() {
        let mut table = RuleTable::builtin();
        let tactics = table.domains.get(&PlanDomain::Tactics).unwrap().habits.clone();
        table
            .domains
            .get_mut(&PlanDomain::Opening)
            .unwrap()
            .habits
            .extend(tactics);
        let yaml = serde_yaml::to_string(&table).unwrap();
        assert!(matches!(
            RuleTable::from_yaml_str(&yaml),
            Err(RuleTableError::MisplacedHabit { .. })
        ));
    }

    #[test]
    fn test_yaml_rejects_missing_domain() {
        let mut table = RuleTable::builtin();
        table.domains.remove(&PlanDomain::Endgame);
        let yaml = serde_yaml::to_string(&table).unwrap();
        assert!(matches!(
            RuleTable::from_yaml_str(&yaml),
            Err(RuleTableError::MissingDomain(PlanDomain::Endgame))
        ));
    }
}
