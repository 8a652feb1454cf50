//! Implementation of the `caissa ingest` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::CommandContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{AnalyzedGame, Config};

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSON file holding one analyzed game or an array of them
    pub file: PathBuf,

    /// Override the current rating of every ingested user
    #[arg(long)]
    pub rating: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngestPayload {
    Many(Vec<AnalyzedGame>),
    One(Box<AnalyzedGame>),
}

impl IngestPayload {
    fn into_games(self) -> Vec<AnalyzedGame> {
        match self {
            Self::Many(games) => games,
            Self::One(game) => vec![*game],
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    pub games: usize,
    pub moves: usize,
    pub users: Vec<String>,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        format!(
            "Ingested {} game(s), {} move record(s) for {}",
            self.games,
            self.moves,
            self.users.join(", ")
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_games(raw: &str) -> Result<Vec<AnalyzedGame>> {
    let payload: IngestPayload = serde_json::from_str(raw).context("Expected an analyzed game or an array of games")?;
    Ok(payload.into_games())
}

pub async fn execute(args: IngestArgs, config: &Config, json_mode: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let games = parse_games(&raw).with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let ctx = CommandContext::open(config).await?;
    let mut users = BTreeSet::new();
    let mut moves = 0;
    for game in &games {
        ctx.analysis
            .insert_game(game)
            .await
            .with_context(|| format!("Failed to store game {}", game.game_id()))?;
        moves += game.moves.len();
        users.insert(game.meta.user_id.clone());
    }

    for user_id in &users {
        if let Some(rating) = args.rating {
            ctx.analysis.set_user_rating(user_id, rating).await?;
        }
        ctx.service.on_game_analyzed(user_id).await;
    }

    tracing::info!(games = games.len(), users = users.len(), "Games ingested");
    output(
        &IngestOutput { games: games.len(), moves, users: users.into_iter().collect() },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = r#"{
        "meta": {
            "game_id": "g1", "user_id": "alice", "user_color": "white", "result": "win",
            "opponent": "bob", "played_at": "2026-03-01T12:00:00Z",
            "opening_name": "Italian Game: Giuoco Piano", "user_rating": 1350
        },
        "moves": [
            {"move_number": 14, "fen_before": "r1bq1rk1/ppp2ppp/2np1n2/2b1p3/2B1P3/2PP1N2/PP3PPP/RNBQ1RK1 w - - 0 14",
             "move_san": "Bg5", "best_move_san": "h3", "eval_before_cp": 40, "eval_after_cp": -180,
             "cp_loss": 220, "classification": "mistake"}
        ]
    }"#;

    #[test]
    fn test_parse_single_game() {
        let games = parse_games(GAME).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id(), "g1");
        assert_eq!(games[0].moves[0].cp_loss, Some(220));
    }

    #[test]
    fn test_parse_array() {
        let games = parse_games(&format!("[{GAME}, {GAME}]")).unwrap();
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_games(r#"{"games": []}"#).is_err());
    }
}
