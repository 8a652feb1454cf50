use serde::{Deserialize, Serialize};

use super::taxonomy::{PlanDomain, RatingTier};

/// Main configuration structure for Caissa
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Move-event extraction thresholds
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Cost-score weights and window
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Dominant-weakness selection gates
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Plan generation
    #[serde(default)]
    pub plan: PlanConfig,

    /// Audit materiality thresholds
    #[serde(default)]
    pub audit: AuditConfig,

    /// Intensity and habit rotation
    #[serde(default)]
    pub habit: HabitConfig,

    /// Score cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Profile store update policy
    #[serde(default)]
    pub store: StoreConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Move-number phase boundaries for one rating tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Last full move that still counts as opening
    pub opening_end_move: u32,
    /// First full move that counts as endgame regardless of material
    pub endgame_start_move: u32,
}

/// Phase thresholds keyed by rating tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(default)]
pub struct TierPhaseThresholds {
    pub beginner: PhaseThresholds,
    pub intermediate: PhaseThresholds,
    pub advanced: PhaseThresholds,
    pub expert: PhaseThresholds,
}

impl TierPhaseThresholds {
    pub fn for_tier(&self, tier: RatingTier) -> PhaseThresholds {
        match tier {
            RatingTier::Beginner => self.beginner,
            RatingTier::Intermediate => self.intermediate,
            RatingTier::Advanced => self.advanced,
            RatingTier::Expert => self.expert,
        }
    }
}

impl Default for TierPhaseThresholds {
    fn default() -> Self {
        Self {
            beginner: PhaseThresholds { opening_end_move: 8, endgame_start_move: 35 },
            intermediate: PhaseThresholds { opening_end_move: 10, endgame_start_move: 40 },
            advanced: PhaseThresholds { opening_end_move: 12, endgame_start_move: 40 },
            expert: PhaseThresholds { opening_end_move: 14, endgame_start_move: 45 },
        }
    }
}

/// Extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractorConfig {
    /// Severity floor outside the opening grace period
    #[serde(default = "default_min_cp_loss")]
    pub min_cp_loss: i32,

    /// Moves 1..=N use the higher grace floor
    #[serde(default = "default_opening_grace_moves")]
    pub opening_grace_moves: u32,

    #[serde(default = "default_opening_grace_min_cp_loss")]
    pub opening_grace_min_cp_loss: i32,

    /// Half-width of the "equal" evaluation band
    #[serde(default = "default_equal_band_cp")]
    pub equal_band_cp: i32,

    /// Evaluations are clamped to +/- this value (mate scores)
    #[serde(default = "default_eval_clamp_cp")]
    pub eval_clamp_cp: i32,

    #[serde(default = "default_blunder_cp")]
    pub blunder_cp: i32,

    #[serde(default = "default_mistake_cp")]
    pub mistake_cp: i32,

    /// Moves made with less clock than this are time-discipline errors
    #[serde(default = "default_time_pressure_secs")]
    pub time_pressure_secs: u32,

    /// Non-pawn, non-king piece count at or below which the position is an endgame
    #[serde(default = "default_endgame_max_pieces")]
    pub endgame_max_pieces: u32,

    #[serde(default)]
    pub phase_thresholds: TierPhaseThresholds,
}

const fn default_min_cp_loss() -> i32 {
    50
}

const fn default_opening_grace_moves() -> u32 {
    8
}

const fn default_opening_grace_min_cp_loss() -> i32 {
    200
}

const fn default_equal_band_cp() -> i32 {
    150
}

const fn default_eval_clamp_cp() -> i32 {
    2000
}

const fn default_blunder_cp() -> i32 {
    300
}

const fn default_mistake_cp() -> i32 {
    100
}

const fn default_time_pressure_secs() -> u32 {
    30
}

const fn default_endgame_max_pieces() -> u32 {
    6
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_cp_loss: default_min_cp_loss(),
            opening_grace_moves: default_opening_grace_moves(),
            opening_grace_min_cp_loss: default_opening_grace_min_cp_loss(),
            equal_band_cp: default_equal_band_cp(),
            eval_clamp_cp: default_eval_clamp_cp(),
            blunder_cp: default_blunder_cp(),
            mistake_cp: default_mistake_cp(),
            time_pressure_secs: default_time_pressure_secs(),
            endgame_max_pieces: default_endgame_max_pieces(),
            phase_thresholds: TierPhaseThresholds::default(),
        }
    }
}

/// Severity weight ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub blunder: f64,
    pub mistake: f64,
    pub inaccuracy: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self { blunder: 3.0, mistake: 2.0, inaccuracy: 1.0 }
    }
}

/// Context weights by win state before the move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextWeights {
    pub losing: f64,
    pub equal: f64,
    pub winning: f64,
}

impl Default for ContextWeights {
    fn default() -> Self {
        Self { losing: 0.6, equal: 1.0, winning: 1.0 }
    }
}

/// Cost-score configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Number of most recent analyzed games in the window
    #[serde(default = "default_window_games")]
    pub window_games: usize,

    /// Fewer analyzed games than this yields "needs more games"
    #[serde(default = "default_min_games")]
    pub min_games: usize,

    /// cp_loss above this is capped before scoring
    #[serde(default = "default_cp_loss_cap")]
    pub cp_loss_cap: i32,

    #[serde(default)]
    pub severity_weights: SeverityWeights,

    #[serde(default)]
    pub context_weights: ContextWeights,

    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,

    /// Added once per event made while winning
    #[serde(default = "default_instability_boost")]
    pub instability_boost: f64,

    /// Boost per self-report before capping
    #[serde(default = "default_reflection_weight")]
    pub reflection_weight: f64,

    /// Max share of a bucket's total that self-reports may contribute
    #[serde(default = "default_reflection_cap_fraction")]
    pub reflection_cap_fraction: f64,
}

const fn default_window_games() -> usize {
    15
}

const fn default_min_games() -> usize {
    3
}

const fn default_cp_loss_cap() -> i32 {
    1000
}

const fn default_frequency_weight() -> f64 {
    0.5
}

const fn default_instability_boost() -> f64 {
    1.5
}

const fn default_reflection_weight() -> f64 {
    1.0
}

const fn default_reflection_cap_fraction() -> f64 {
    0.5
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_games: default_window_games(),
            min_games: default_min_games(),
            cp_loss_cap: default_cp_loss_cap(),
            severity_weights: SeverityWeights::default(),
            context_weights: ContextWeights::default(),
            frequency_weight: default_frequency_weight(),
            instability_boost: default_instability_boost(),
            reflection_weight: default_reflection_weight(),
            reflection_cap_fraction: default_reflection_cap_fraction(),
        }
    }
}

/// Selection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectionConfig {
    /// Endgame buckets are ineligible below this rating
    #[serde(default = "default_endgame_min_rating")]
    pub endgame_min_rating: u32,
}

const fn default_endgame_min_rating() -> u32 {
    1000
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { endgame_min_rating: default_endgame_min_rating() }
    }
}

/// Plan generation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanConfig {
    #[serde(default = "default_max_example_positions")]
    pub max_example_positions: usize,

    /// Games needed with an opening before it can be recommended
    #[serde(default = "default_min_opening_games")]
    pub min_opening_games: usize,

    /// Games considered for opening statistics
    #[serde(default = "default_opening_stats_games")]
    pub opening_stats_games: usize,

    /// YAML rule table replacing the built-in one
    #[serde(default)]
    pub rule_table_path: Option<String>,
}

const fn default_max_example_positions() -> usize {
    5
}

const fn default_min_opening_games() -> usize {
    3
}

const fn default_opening_stats_games() -> usize {
    50
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_example_positions: default_max_example_positions(),
            min_opening_games: default_min_opening_games(),
            opening_stats_games: default_opening_stats_games(),
            rule_table_path: None,
        }
    }
}

/// Per-domain cp thresholds separating partial from missed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(default)]
pub struct MaterialityThresholds {
    pub opening: i32,
    pub safety: i32,
    pub tactics: i32,
    pub advantage_discipline: i32,
    pub endgame: i32,
}

impl MaterialityThresholds {
    pub fn for_domain(&self, domain: PlanDomain) -> i32 {
        match domain {
            PlanDomain::Opening => self.opening,
            PlanDomain::Safety => self.safety,
            PlanDomain::Tactics => self.tactics,
            PlanDomain::AdvantageDiscipline => self.advantage_discipline,
            PlanDomain::Endgame => self.endgame,
        }
    }
}

impl Default for MaterialityThresholds {
    fn default() -> Self {
        Self {
            opening: 150,
            safety: 200,
            tactics: 200,
            advantage_discipline: 150,
            endgame: 200,
        }
    }
}

/// Audit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    #[serde(default)]
    pub materiality_cp: MaterialityThresholds,
}

/// Intensity and rotation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HabitConfig {
    /// Intensity for users without habit state
    #[serde(default = "default_initial_intensity")]
    pub initial_intensity: u8,

    /// Attempts kept for success-rate checks
    #[serde(default = "default_rotation_window")]
    pub rotation_window: usize,

    #[serde(default = "default_improving_success_rate")]
    pub improving_success_rate: f64,

    /// Attempts required before active can become improving
    #[serde(default = "default_min_attempts_for_improving")]
    pub min_attempts_for_improving: usize,

    #[serde(default = "default_resolve_consecutive_hits")]
    pub resolve_consecutive_hits: u32,

    #[serde(default = "default_resolve_hits_in_window")]
    pub resolve_hits_in_window: usize,
}

const fn default_initial_intensity() -> u8 {
    2
}

const fn default_rotation_window() -> usize {
    8
}

const fn default_improving_success_rate() -> f64 {
    0.6
}

const fn default_min_attempts_for_improving() -> usize {
    5
}

const fn default_resolve_consecutive_hits() -> u32 {
    4
}

const fn default_resolve_hits_in_window() -> usize {
    6
}

impl Default for HabitConfig {
    fn default() -> Self {
        Self {
            initial_intensity: default_initial_intensity(),
            rotation_window: default_rotation_window(),
            improving_success_rate: default_improving_success_rate(),
            min_attempts_for_improving: default_min_attempts_for_improving(),
            resolve_consecutive_hits: default_resolve_consecutive_hits(),
            resolve_hits_in_window: default_resolve_hits_in_window(),
        }
    }
}

/// Score cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of users with a cached score snapshot
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_capacity() -> u64 {
    10_000
}

const fn default_cache_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Profile store update policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Retries after an optimistic-lock conflict
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

const fn default_max_update_retries() -> u32 {
    3
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_update_retries: default_max_update_retries() }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".caissa/caissa.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}
