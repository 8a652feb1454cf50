//! Domain errors for the Caissa coaching engine.
//!
//! Recoverable conditions (too few games, malformed records, clean streaks,
//! stale plan references) are result states, not errors. What remains here
//! are store failures and broken invariants.

use thiserror::Error;
use uuid::Uuid;

use super::models::Bucket;

/// Domain-level errors that can occur in the coaching engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Invariant violated for user {user_id} (game {game_id:?}, bucket {bucket:?}): {detail}")]
    InvariantViolation {
        user_id: String,
        game_id: Option<String>,
        bucket: Option<Bucket>,
        detail: String,
    },
}

impl DomainError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
