pub mod audit_engine;
pub mod coaching_service;
pub mod cost_scorer;
pub mod event_extractor;
pub mod intensity;
pub mod plan_generator;
pub mod rule_table;
pub mod score_cache;
pub mod weakness_selector;

pub use audit_engine::AuditEngine;
pub use coaching_service::CoachingService;
pub use cost_scorer::CostScoreEngine;
pub use event_extractor::MoveEventExtractor;
pub use intensity::HabitLoop;
pub use plan_generator::{PlanGenerator, PlanRequest};
pub use rule_table::{RuleTable, RuleTableError};
pub use score_cache::ScoreCache;
pub use weakness_selector::WeaknessSelector;
