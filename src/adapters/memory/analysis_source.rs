//! In-memory analysis source.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::AnalyzedGame;
use crate::domain::ports::AnalysisSource;

#[derive(Default)]
pub struct InMemoryAnalysisSource {
    games: RwLock<HashMap<String, Vec<AnalyzedGame>>>,
    ratings: RwLock<HashMap<String, u32>>,
}

impl InMemoryAnalysisSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a game.
    pub async fn add_game(&self, game: AnalyzedGame) {
        let mut games = self.games.write().await;
        let user_games = games.entry(game.meta.user_id.clone()).or_default();
        user_games.retain(|g| g.game_id() != game.game_id());
        user_games.push(game);
        user_games.sort_by(|a, b| {
            b.meta
                .played_at
                .cmp(&a.meta.played_at)
                .then_with(|| b.meta.game_id.cmp(&a.meta.game_id))
        });
    }

    pub async fn set_rating(&self, user_id: &str, rating: u32) {
        self.ratings.write().await.insert(user_id.to_string(), rating);
    }
}

#[async_trait]
impl AnalysisSource for InMemoryAnalysisSource {
    async fn recent_games(&self, user_id: &str, limit: usize) -> DomainResult<Vec<AnalyzedGame>> {
        Ok(self
            .games
            .read()
            .await
            .get(user_id)
            .map(|games| games.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn count_games(&self, user_id: &str) -> DomainResult<usize> {
        Ok(self.games.read().await.get(user_id).map_or(0, Vec::len))
    }

    async fn user_rating(&self, user_id: &str) -> DomainResult<Option<u32>> {
        Ok(self.ratings.read().await.get(user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Color, GameMeta, GameResult};
    use chrono::{Duration, Utc};

    fn game(id: &str, minutes_ago: i64) -> AnalyzedGame {
        AnalyzedGame {
            meta: GameMeta {
                game_id: id.to_string(),
                user_id: "u1".to_string(),
                user_color: Color::White,
                result: GameResult::Win,
                opponent: None,
                played_at: Utc::now() - Duration::minutes(minutes_ago),
                opening_name: None,
                user_rating: None,
            },
            moves: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_games_are_newest_first() {
        let source = InMemoryAnalysisSource::new();
        source.add_game(game("old", 30)).await;
        source.add_game(game("new", 1)).await;
        source.add_game(game("mid", 10)).await;
        source.add_game(game("mid", 10)).await;

        let ids: Vec<String> = source
            .recent_games("u1", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.meta.game_id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(source.count_games("u1").await.unwrap(), 3);
        assert_eq!(source.user_rating("u1").await.unwrap(), None);
    }

    #[test]
    fn test_rating_is_per_user() {
        let source = InMemoryAnalysisSource::new();
        tokio_test::block_on(source.set_rating("u1", 1450));
        assert_eq!(tokio_test::block_on(source.user_rating("u1")).unwrap(), Some(1450));
        assert_eq!(tokio_test::block_on(source.user_rating("u2")).unwrap(), None);
    }
}
