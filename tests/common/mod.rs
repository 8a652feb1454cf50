//! Common test utilities for integration tests
//!
//! Game builders that produce move records the extractor classifies into a
//! known bucket, plus service constructors over the in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use caissa::adapters::memory::{InMemoryAnalysisSource, InMemoryProfileStore};
use caissa::domain::models::{AnalyzedGame, Color, Config, GameMeta, GameResult, MoveEvaluation};
use caissa::services::CoachingService;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Middlegame placement with fourteen minor and major pieces.
const MIDDLEGAME_PLACEMENT: &str = "r1bq1rk1/ppp2ppp/2np1n2/2b1p3/2B1P3/2PP1N2/PP3PPP/RNBQ1RK1";

pub type MemoryService = CoachingService<InMemoryAnalysisSource, InMemoryProfileStore>;

pub struct Harness {
    pub analysis: Arc<InMemoryAnalysisSource>,
    pub store: Arc<InMemoryProfileStore>,
    pub service: MemoryService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let analysis = Arc::new(InMemoryAnalysisSource::new());
        let store = Arc::new(InMemoryProfileStore::new());
        let service = CoachingService::new(Arc::clone(&analysis), Arc::clone(&store), config)
            .expect("default config builds a service");
        Self { analysis, store, service }
    }

    /// Add a game and tell the service about it.
    pub async fn play(&self, game: AnalyzedGame) {
        let user_id = game.meta.user_id.clone();
        self.analysis.add_game(game).await;
        self.service.on_game_analyzed(&user_id).await;
    }
}

/// Setup test logging
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn played_at(index: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap() + Duration::hours(index)
}

/// Builds an analyzed game one user move at a time.
///
/// Evaluations are given from the user's point of view and converted to
/// white-relative centipawns.
pub struct GameBuilder {
    meta: GameMeta,
    moves: Vec<MoveEvaluation>,
}

impl GameBuilder {
    /// A win as white in the Italian Game. `index` orders games in time.
    pub fn new(user_id: &str, game_id: &str, index: i64) -> Self {
        Self {
            meta: GameMeta {
                game_id: game_id.to_string(),
                user_id: user_id.to_string(),
                user_color: Color::White,
                result: GameResult::Win,
                opponent: Some("sparring".to_string()),
                played_at: played_at(index),
                opening_name: Some("Italian Game: Giuoco Piano".to_string()),
                user_rating: Some(1400),
            },
            moves: Vec::new(),
        }
    }

    /// Must be called before any move is added.
    pub fn color(mut self, color: Color) -> Self {
        self.meta.user_color = color;
        self
    }

    pub fn result(mut self, result: GameResult) -> Self {
        self.meta.result = result;
        self
    }

    pub fn opening(mut self, name: Option<&str>) -> Self {
        self.meta.opening_name = name.map(str::to_string);
        self
    }

    fn fen(&self, move_number: u32) -> String {
        let side = match self.meta.user_color {
            Color::White => "w",
            Color::Black => "b",
        };
        format!("{MIDDLEGAME_PLACEMENT} {side} - - 0 {move_number}")
    }

    fn push(mut self, move_number: u32, played: &str, best: &str, before: i32, cp_loss: i32, label: &str) -> Self {
        let sign = match self.meta.user_color {
            Color::White => 1,
            Color::Black => -1,
        };
        let record = MoveEvaluation::new(move_number, self.fen(move_number))
            .with_moves(played, best)
            .with_evals(before * sign, (before - cp_loss) * sign)
            .with_cp_loss(cp_loss)
            .with_classification(label);
        self.moves.push(record);
        self
    }

    /// Hangs a piece in an equal middlegame (Piece Safety).
    pub fn hung_piece(self, move_number: u32, cp_loss: i32) -> Self {
        self.push(move_number, "Qd2", "Re1", 0, cp_loss, "blunder")
    }

    /// Misses a forcing win in an equal middlegame (Tactical Execution).
    pub fn missed_tactic(self, move_number: u32, cp_loss: i32, label: &str) -> Self {
        self.push(move_number, "h3", "Bxf7+", 0, cp_loss, label)
    }

    /// Throws away a winning position (Advantage Discipline).
    pub fn blunder_while_ahead(self, move_number: u32, eval_before: i32, cp_loss: i32) -> Self {
        self.push(move_number, "Qxb7", "Rad1", eval_before, cp_loss, "blunder")
    }

    /// A near-best move that never qualifies as a mistake.
    pub fn solid_move(self, move_number: u32) -> Self {
        self.push(move_number, "Re1", "Re1", 30, 5, "good")
    }

    pub fn build(self) -> AnalyzedGame {
        AnalyzedGame { meta: self.meta, moves: self.moves }
    }
}

/// A game with only near-best moves.
pub fn clean_game(user_id: &str, game_id: &str, index: i64) -> AnalyzedGame {
    GameBuilder::new(user_id, game_id, index)
        .solid_move(15)
        .solid_move(22)
        .build()
}
