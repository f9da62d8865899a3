//! Where games come from and reviews go.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chess_core::GameRecord;
use chrono::{DateTime, Utc};

use crate::analyzer::GameReview;
use crate::error::ReviewError;

/// A saved review and its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReview {
    pub id: i64,
    pub review: GameReview,
}

/// Persistence boundary. Holds at most one review per game; saving marks
/// the source game as analyzed.
pub trait GameStore: Send + Sync {
    fn fetch_game(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Option<GameRecord>, ReviewError>> + Send;

    fn find_review(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Option<StoredReview>, ReviewError>> + Send;

    /// Store a review and return its id. A second save for the same game
    /// keeps the first review and returns its id.
    fn save_review(
        &self,
        review: &GameReview,
    ) -> impl Future<Output = Result<i64, ReviewError>> + Send;
}

#[derive(Debug, Default)]
struct MemoryTables {
    games: HashMap<i64, GameRecord>,
    analyzed_at: HashMap<i64, DateTime<Utc>>,
    reviews: HashMap<i64, StoredReview>,
    next_id: i64,
}

/// In-process store for tests and database-less runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_game(&self, game: GameRecord) {
        self.tables().games.insert(game.id, game);
    }

    pub fn analyzed_at(&self, game_id: i64) -> Option<DateTime<Utc>> {
        self.tables().analyzed_at.get(&game_id).copied()
    }

    pub fn review_count(&self) -> usize {
        self.tables().reviews.len()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GameStore for MemoryStore {
    async fn fetch_game(&self, game_id: i64) -> Result<Option<GameRecord>, ReviewError> {
        Ok(self.tables().games.get(&game_id).cloned())
    }

    async fn find_review(&self, game_id: i64) -> Result<Option<StoredReview>, ReviewError> {
        Ok(self.tables().reviews.get(&game_id).cloned())
    }

    async fn save_review(&self, review: &GameReview) -> Result<i64, ReviewError> {
        let mut tables = self.tables();
        if let Some(existing) = tables.reviews.get(&review.game_id) {
            return Ok(existing.id);
        }
        tables.next_id += 1;
        let id = tables.next_id;
        tables.reviews.insert(
            review.game_id,
            StoredReview {
                id,
                review: review.clone(),
            },
        );
        tables.analyzed_at.insert(review.game_id, review.analyzed_at);
        Ok(id)
    }
}
