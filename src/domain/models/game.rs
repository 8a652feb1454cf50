//! Upstream analysis records.
//!
//! These arrive from the external analysis engine and are read-only ground
//! truth. Evaluation fields are optional because upstream records can be
//! partial; the extractor decides what is usable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::taxonomy::Color;

/// Outcome of a game from the user's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Win,
    Draw,
    Loss,
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Draw => "draw",
            Self::Loss => "loss",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "win" | "won" => Some(Self::Win),
            "draw" | "drawn" => Some(Self::Draw),
            "loss" | "lost" => Some(Self::Loss),
            _ => None,
        }
    }

    /// Points scored: 1 for a win, 0.5 for a draw.
    pub fn points(&self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.5,
            Self::Loss => 0.0,
        }
    }
}

/// Per-move evaluation record as produced by the analysis engine.
///
/// Evaluations are white-relative centipawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvaluation {
    /// Full-move number (1-based)
    pub move_number: u32,
    /// FEN of the position before the move
    #[serde(default)]
    pub fen_before: Option<String>,
    /// Move played, in SAN
    #[serde(default)]
    pub move_san: Option<String>,
    /// Engine best move, in SAN
    #[serde(default)]
    pub best_move_san: Option<String>,
    #[serde(default)]
    pub eval_before_cp: Option<i32>,
    #[serde(default)]
    pub eval_after_cp: Option<i32>,
    /// Centipawn loss reported upstream
    #[serde(default)]
    pub cp_loss: Option<i32>,
    /// Upstream label (best, good, inaccuracy, mistake, blunder, ...)
    #[serde(default)]
    pub classification: Option<String>,
    /// Mover's remaining clock in seconds, when the game had clock data
    #[serde(default)]
    pub clock_remaining_secs: Option<u32>,
}

impl MoveEvaluation {
    /// Minimal record for a move; optional fields start empty.
    pub fn new(move_number: u32, fen_before: impl Into<String>) -> Self {
        Self {
            move_number,
            fen_before: Some(fen_before.into()),
            move_san: None,
            best_move_san: None,
            eval_before_cp: None,
            eval_after_cp: None,
            cp_loss: None,
            classification: None,
            clock_remaining_secs: None,
        }
    }

    pub fn with_moves(mut self, played: impl Into<String>, best: impl Into<String>) -> Self {
        self.move_san = Some(played.into());
        self.best_move_san = Some(best.into());
        self
    }

    pub fn with_evals(mut self, before: i32, after: i32) -> Self {
        self.eval_before_cp = Some(before);
        self.eval_after_cp = Some(after);
        self
    }

    pub fn with_cp_loss(mut self, cp_loss: i32) -> Self {
        self.cp_loss = Some(cp_loss);
        self
    }

    pub fn with_classification(mut self, label: impl Into<String>) -> Self {
        self.classification = Some(label.into());
        self
    }

    pub fn with_clock(mut self, secs: u32) -> Self {
        self.clock_remaining_secs = Some(secs);
        self
    }
}

/// Game metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMeta {
    pub game_id: String,
    pub user_id: String,
    pub user_color: Color,
    pub result: GameResult,
    #[serde(default)]
    pub opponent: Option<String>,
    pub played_at: DateTime<Utc>,
    #[serde(default)]
    pub opening_name: Option<String>,
    /// User rating at the time of the game
    #[serde(default)]
    pub user_rating: Option<u32>,
}

/// A fully analyzed game: metadata plus the engine's per-move records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedGame {
    #[serde(flatten)]
    pub meta: GameMeta,
    #[serde(default)]
    pub moves: Vec<MoveEvaluation>,
}

impl AnalyzedGame {
    pub fn game_id(&self) -> &str {
        &self.meta.game_id
    }
}
