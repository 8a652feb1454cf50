pub mod audit;
pub mod config;
pub mod cost;
pub mod game;
pub mod habit;
pub mod mistake;
pub mod plan;
pub mod taxonomy;

pub use audit::{AuditOutcome, AuditReason, AuditReport, AuditResult, AuditStatus, AuditSummary};
pub use config::{
    AuditConfig, CacheConfig, Config, ContextWeights, DatabaseConfig, ExtractorConfig,
    HabitConfig, LoggingConfig, MaterialityThresholds, PhaseThresholds, PlanConfig,
    ScoringConfig, SelectionConfig, SeverityWeights, StoreConfig, TierPhaseThresholds,
};
pub use cost::{
    CostScore, EvidenceSource, GameEvidence, RankedBucket, ReflectionBoost, ScoreBreakdown,
    WeaknessReport, WeaknessSelection,
};
pub use game::{AnalyzedGame, GameMeta, GameResult, MoveEvaluation};
pub use habit::{
    BaselineSnapshot, HabitPhase, HabitState, HabitTransition, Intensity, InvalidIntensity,
    Reflection, ResolvedHabit,
};
pub use mistake::{Evidence, ExtractionReport, MistakeEvent};
pub use plan::{
    DomainCard, ExamplePosition, FocusItem, OpeningRecommendation, Plan, PlanOutcome, PlanRule,
    RuleKind,
};
pub use taxonomy::{Bucket, Color, Phase, PlanDomain, RatingTier, Severity, WinState};
