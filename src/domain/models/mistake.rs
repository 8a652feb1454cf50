//! Classified, qualifying move-level errors.

use serde::{Deserialize, Serialize};

use super::taxonomy::{Bucket, Phase, Severity, WinState};

/// A single qualifying mistake by the user.
///
/// Evaluations are user-relative: positive means the user stands better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeEvent {
    pub game_id: String,
    pub move_number: u32,
    pub bucket: Bucket,
    pub phase: Phase,
    pub eval_before: i32,
    pub eval_after: i32,
    pub cp_loss: i32,
    pub win_state: WinState,
    pub severity: Severity,
    pub fen: String,
    #[serde(default)]
    pub played_move: Option<String>,
    #[serde(default)]
    pub best_move: Option<String>,
}

impl MistakeEvent {
    /// Position evidence for audit results and example positions.
    pub fn evidence(&self) -> Evidence {
        Evidence {
            move_number: self.move_number,
            fen: self.fen.clone(),
            cp_loss: self.cp_loss,
            eval_before: self.eval_before,
        }
    }
}

/// Pointer to the move that supports a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub move_number: u32,
    pub fen: String,
    pub cp_loss: i32,
    pub eval_before: i32,
}

/// Counters describing what an extraction pass discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub total_records: usize,
    pub opponent_moves: usize,
    pub below_floor: usize,
    pub malformed: usize,
    pub events: usize,
}

impl ExtractionReport {
    pub fn merge(&mut self, other: &Self) {
        self.total_records += other.total_records;
        self.opponent_moves += other.opponent_moves;
        self.below_floor += other.below_floor;
        self.malformed += other.malformed;
        self.events += other.events;
    }
}
