//! SQLite-backed analysis store.
//!
//! Holds games and their per-move evaluations as written by the external
//! analysis engine (or `caissa ingest`). The coaching engine only reads it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{format_timestamp, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AnalyzedGame, Color, GameMeta, GameResult, MoveEvaluation};
use crate::domain::ports::AnalysisSource;

#[derive(Clone)]
pub struct SqliteAnalysisStore {
    pool: SqlitePool,
}

impl SqliteAnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a game and all of its move records.
    ///
    /// A game's rating also updates the user's current rating when the
    /// game is the most recent one seen.
    pub async fn insert_game(&self, game: &AnalyzedGame) -> DomainResult<()> {
        let meta = &game.meta;
        let played_at = format_timestamp(meta.played_at);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM move_evaluations WHERE game_id = ?")
            .bind(&meta.game_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO games (game_id, user_id, user_color, result, opponent, played_at, opening_name, user_rating, analyzed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(game_id) DO UPDATE SET
                   user_id = excluded.user_id, user_color = excluded.user_color, result = excluded.result,
                   opponent = excluded.opponent, played_at = excluded.played_at,
                   opening_name = excluded.opening_name, user_rating = excluded.user_rating,
                   analyzed_at = excluded.analyzed_at"#,
        )
        .bind(&meta.game_id)
        .bind(&meta.user_id)
        .bind(meta.user_color.as_str())
        .bind(meta.result.as_str())
        .bind(&meta.opponent)
        .bind(&played_at)
        .bind(&meta.opening_name)
        .bind(meta.user_rating.map(i64::from))
        .bind(format_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        for (ply_index, record) in game.moves.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO move_evaluations (game_id, ply_index, move_number, fen_before, move_san, best_move_san,
                       eval_before_cp, eval_after_cp, cp_loss, classification, clock_remaining_secs)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&meta.game_id)
            .bind(i64::try_from(ply_index).unwrap_or(i64::MAX))
            .bind(i64::from(record.move_number))
            .bind(&record.fen_before)
            .bind(&record.move_san)
            .bind(&record.best_move_san)
            .bind(record.eval_before_cp)
            .bind(record.eval_after_cp)
            .bind(record.cp_loss)
            .bind(&record.classification)
            .bind(record.clock_remaining_secs.map(i64::from))
            .execute(&mut *tx)
            .await?;
        }

        if let Some(rating) = meta.user_rating {
            sqlx::query(
                r#"INSERT INTO user_ratings (user_id, rating, updated_at) VALUES (?, ?, ?)
                   ON CONFLICT(user_id) DO UPDATE SET rating = excluded.rating, updated_at = excluded.updated_at
                   WHERE excluded.updated_at >= user_ratings.updated_at"#,
            )
            .bind(&meta.user_id)
            .bind(i64::from(rating))
            .bind(&played_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Override a user's current rating.
    pub async fn set_user_rating(&self, user_id: &str, rating: u32) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO user_ratings (user_id, rating, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET rating = excluded.rating, updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(i64::from(rating))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_moves(&self, game_id: &str) -> DomainResult<Vec<MoveEvaluation>> {
        let rows: Vec<MoveRow> = sqlx::query_as(
            r#"SELECT move_number, fen_before, move_san, best_move_san, eval_before_cp, eval_after_cp,
                      cp_loss, classification, clock_remaining_secs
               FROM move_evaluations WHERE game_id = ? ORDER BY ply_index"#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MoveEvaluation::try_from).collect()
    }
}

#[async_trait]
impl AnalysisSource for SqliteAnalysisStore {
    async fn recent_games(&self, user_id: &str, limit: usize) -> DomainResult<Vec<AnalyzedGame>> {
        let rows: Vec<GameRow> = sqlx::query_as(
            r#"SELECT game_id, user_id, user_color, result, opponent, played_at, opening_name, user_rating
               FROM games WHERE user_id = ?
               ORDER BY played_at DESC, game_id DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            let meta = GameMeta::try_from(row)?;
            let moves = self.load_moves(&meta.game_id).await?;
            games.push(AnalyzedGame { meta, moves });
        }
        Ok(games)
    }

    async fn count_games(&self, user_id: &str) -> DomainResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|e| DomainError::DatabaseError(e.to_string()))
    }

    async fn user_rating(&self, user_id: &str) -> DomainResult<Option<u32>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT rating FROM user_ratings WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(rating,)| u32::try_from(rating).map_err(|e| DomainError::SerializationError(e.to_string())))
            .transpose()
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    game_id: String,
    user_id: String,
    user_color: String,
    result: String,
    opponent: Option<String>,
    played_at: String,
    opening_name: Option<String>,
    user_rating: Option<i64>,
}

impl TryFrom<GameRow> for GameMeta {
    type Error = DomainError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let user_color = Color::from_str(&row.user_color)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid colour: {}", row.user_color)))?;
        let result = GameResult::from_str(&row.result)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid result: {}", row.result)))?;
        let user_rating = row
            .user_rating
            .map(u32::try_from)
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Self {
            game_id: row.game_id,
            user_id: row.user_id,
            user_color,
            result,
            opponent: row.opponent,
            played_at: parse_datetime(&row.played_at)?,
            opening_name: row.opening_name,
            user_rating,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MoveRow {
    move_number: i64,
    fen_before: Option<String>,
    move_san: Option<String>,
    best_move_san: Option<String>,
    eval_before_cp: Option<i32>,
    eval_after_cp: Option<i32>,
    cp_loss: Option<i32>,
    classification: Option<String>,
    clock_remaining_secs: Option<i64>,
}

impl TryFrom<MoveRow> for MoveEvaluation {
    type Error = DomainError;

    fn try_from(row: MoveRow) -> Result<Self, Self::Error> {
        let to_u32 = |v: i64| u32::try_from(v).map_err(|e| DomainError::SerializationError(e.to_string()));
        Ok(Self {
            move_number: to_u32(row.move_number)?,
            fen_before: row.fen_before,
            move_san: row.move_san,
            best_move_san: row.best_move_san,
            eval_before_cp: row.eval_before_cp,
            eval_after_cp: row.eval_after_cp,
            cp_loss: row.cp_loss,
            classification: row.classification,
            clock_remaining_secs: row.clock_remaining_secs.map(to_u32).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::{Duration, TimeZone};

    fn game(id: &str, minutes: i64, rating: u32) -> AnalyzedGame {
        AnalyzedGame {
            meta: GameMeta {
                game_id: id.to_string(),
                user_id: "u1".to_string(),
                user_color: Color::Black,
                result: GameResult::Draw,
                opponent: Some("opp".to_string()),
                played_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
                opening_name: Some("French Defense".to_string()),
                user_rating: Some(rating),
            },
            moves: vec![
                MoveEvaluation::new(1, "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                    .with_moves("e6", "e5")
                    .with_evals(30, 35),
                MoveEvaluation::new(12, "r1bqk2r/pp3ppp/2n1pn2/3p4/3P4/2N2N2/PP2BPPP/R2QKB1R b KQkq - 0 12")
                    .with_moves("Qxb2", "O-O")
                    .with_evals(20, 340)
                    .with_classification("blunder")
                    .with_clock(95),
            ],
        }
    }

    #[tokio::test]
    async fn test_games_round_trip_newest_first() {
        let store = SqliteAnalysisStore::new(create_migrated_test_pool().await.unwrap());
        store.insert_game(&game("g1", 0, 1200)).await.unwrap();
        store.insert_game(&game("g3", 20, 1250)).await.unwrap();
        store.insert_game(&game("g2", 10, 1230)).await.unwrap();

        let games = store.recent_games("u1", 2).await.unwrap();
        let ids: Vec<&str> = games.iter().map(AnalyzedGame::game_id).collect();
        assert_eq!(ids, vec!["g3", "g2"]);
        assert_eq!(games[0], game("g3", 20, 1250));

        assert_eq!(store.count_games("u1").await.unwrap(), 3);
        assert_eq!(store.count_games("nobody").await.unwrap(), 0);
        assert_eq!(store.user_rating("u1").await.unwrap(), Some(1250));
    }

    #[tokio::test]
    async fn test_reinsert_replaces_moves() {
        let store = SqliteAnalysisStore::new(create_migrated_test_pool().await.unwrap());
        let mut g = game("g1", 0, 1200);
        store.insert_game(&g).await.unwrap();
        g.moves.truncate(1);
        store.insert_game(&g).await.unwrap();

        let games = store.recent_games("u1", 10).await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].moves.len(), 1);
    }
}
