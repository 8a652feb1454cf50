//! Move-event extraction.
//!
//! Turns the analysis engine's per-move records into classified
//! `MistakeEvent`s for the user's own moves. Pure transform: malformed
//! records are counted and logged, never raised.

use tracing::{debug, warn};

use crate::domain::models::{
    AnalyzedGame, Bucket, Color, ExtractionReport, ExtractorConfig, MistakeEvent, MoveEvaluation,
    Phase, RatingTier, Severity, WinState,
};

/// The parts of a FEN the extractor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenSummary {
    pub side_to_move: Color,
    /// Knights, bishops, rooks and queens of both colours
    pub minor_and_major_pieces: u32,
}

/// Read the piece-placement and active-colour fields of a FEN.
///
/// Returns `None` unless the placement has eight ranks of eight files.
pub fn parse_fen(fen: &str) -> Option<FenSummary> {
    let mut fields = fen.split_whitespace();
    let placement = fields.next()?;
    let side_to_move = match fields.next()? {
        "w" => Color::White,
        "b" => Color::Black,
        _ => return None,
    };

    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return None;
    }

    let mut pieces = 0;
    for rank in ranks {
        let mut files = 0;
        for c in rank.chars() {
            match c {
                '1'..='8' => files += c.to_digit(10)?,
                'p' | 'P' | 'k' | 'K' => files += 1,
                'n' | 'N' | 'b' | 'B' | 'r' | 'R' | 'q' | 'Q' => {
                    files += 1;
                    pieces += 1;
                }
                _ => return None,
            }
        }
        if files != 8 {
            return None;
        }
    }

    Some(FenSummary { side_to_move, minor_and_major_pieces: pieces })
}

/// True when a SAN move is a capture, check or mate.
fn is_forcing(san: &str) -> bool {
    san.contains('x') || san.contains('+') || san.contains('#')
}

/// Extracts mistake events from analyzed games.
#[derive(Debug, Clone, Default)]
pub struct MoveEventExtractor {
    config: ExtractorConfig,
}

impl MoveEventExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract events from one game.
    pub fn extract(&self, game: &AnalyzedGame, tier: RatingTier) -> (Vec<MistakeEvent>, ExtractionReport) {
        let mut report = ExtractionReport::default();
        let mut events = Vec::new();

        for record in &game.moves {
            report.total_records += 1;
            match self.classify(game, record, tier) {
                Classified::Event(event) => events.push(*event),
                Classified::Opponent => report.opponent_moves += 1,
                Classified::BelowFloor => report.below_floor += 1,
                Classified::Malformed(reason) => {
                    report.malformed += 1;
                    warn!(
                        user_id = %game.meta.user_id,
                        game_id = %game.meta.game_id,
                        move_number = record.move_number,
                        reason,
                        "Dropping malformed move record"
                    );
                }
            }
        }

        report.events = events.len();
        debug!(
            game_id = %game.meta.game_id,
            events = report.events,
            malformed = report.malformed,
            below_floor = report.below_floor,
            "Extracted mistake events"
        );
        (events, report)
    }

    /// Extract events from a window of games, preserving game order.
    pub fn extract_window(
        &self,
        games: &[AnalyzedGame],
        tier: RatingTier,
    ) -> (Vec<MistakeEvent>, ExtractionReport) {
        let mut report = ExtractionReport::default();
        let mut events = Vec::new();
        for game in games {
            let (game_events, game_report) = self.extract(game, tier);
            report.merge(&game_report);
            events.extend(game_events);
        }
        (events, report)
    }

    fn classify(&self, game: &AnalyzedGame, record: &MoveEvaluation, tier: RatingTier) -> Classified {
        if record.move_number == 0 {
            return Classified::Malformed("move number is zero");
        }

        let Some(fen) = record.fen_before.as_deref() else {
            return Classified::Malformed("missing fen");
        };
        let Some(summary) = parse_fen(fen) else {
            return Classified::Malformed("unreadable fen");
        };

        let user_color = game.meta.user_color;
        if summary.side_to_move != user_color {
            return Classified::Opponent;
        }

        let clamp = self.config.eval_clamp_cp;
        let sign = match user_color {
            Color::White => 1,
            Color::Black => -1,
        };
        let relative = |cp: i32| cp.clamp(-clamp, clamp) * sign;

        let Some(eval_before) = record.eval_before_cp.map(relative) else {
            return Classified::Malformed("missing eval_before");
        };
        let eval_after = record.eval_after_cp.map(relative);

        let cp_loss = match (record.cp_loss, eval_after) {
            (Some(loss), _) => loss.max(0),
            (None, Some(after)) => (eval_before - after).max(0),
            (None, None) => return Classified::Malformed("missing cp_loss and eval_after"),
        };
        let eval_after = eval_after.unwrap_or(eval_before - cp_loss);

        let floor = if record.move_number <= self.config.opening_grace_moves {
            self.config.opening_grace_min_cp_loss
        } else {
            self.config.min_cp_loss
        };
        if cp_loss < floor {
            return Classified::BelowFloor;
        }

        let severity = record
            .classification
            .as_deref()
            .and_then(Severity::from_str)
            .unwrap_or_else(|| self.severity_from_loss(cp_loss));

        let phase = self.phase(record.move_number, summary, tier);
        let win_state = WinState::classify(eval_before, self.config.equal_band_cp);
        let bucket = self.bucket(record, phase, win_state, severity);

        Classified::Event(Box::new(MistakeEvent {
            game_id: game.meta.game_id.clone(),
            move_number: record.move_number,
            bucket,
            phase,
            eval_before,
            eval_after,
            cp_loss,
            win_state,
            severity,
            fen: fen.to_string(),
            played_move: record.move_san.clone(),
            best_move: record.best_move_san.clone(),
        }))
    }

    fn severity_from_loss(&self, cp_loss: i32) -> Severity {
        if cp_loss >= self.config.blunder_cp {
            Severity::Blunder
        } else if cp_loss >= self.config.mistake_cp {
            Severity::Mistake
        } else {
            Severity::Inaccuracy
        }
    }

    /// Classify the phase by move number, with an early endgame on thin material.
    pub fn phase(&self, move_number: u32, summary: FenSummary, tier: RatingTier) -> Phase {
        let thresholds = self.config.phase_thresholds.for_tier(tier);
        if move_number <= thresholds.opening_end_move {
            Phase::Opening
        } else if move_number >= thresholds.endgame_start_move
            || summary.minor_and_major_pieces <= self.config.endgame_max_pieces
        {
            Phase::Endgame
        } else {
            Phase::Middlegame
        }
    }

    fn bucket(&self, record: &MoveEvaluation, phase: Phase, win_state: WinState, severity: Severity) -> Bucket {
        if record
            .clock_remaining_secs
            .is_some_and(|secs| secs < self.config.time_pressure_secs)
        {
            return Bucket::TimeDiscipline;
        }
        if phase == Phase::Opening {
            return Bucket::OpeningStability;
        }
        if win_state == WinState::Winning && severity >= Severity::Mistake {
            return Bucket::AdvantageDiscipline;
        }
        if phase == Phase::Endgame {
            return Bucket::EndgameFundamentals;
        }
        if record.best_move_san.as_deref().is_some_and(is_forcing) {
            return Bucket::TacticalExecution;
        }
        if severity == Severity::Blunder {
            Bucket::PieceSafety
        } else {
            Bucket::ThreatAwareness
        }
    }
}

enum Classified {
    Event(Box<MistakeEvent>),
    Opponent,
    BelowFloor,
    Malformed(&'static str),
}
