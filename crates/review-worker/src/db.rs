//! Postgres-backed game store

use chess_core::GameRecord;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::analyzer::GameReview;
use crate::error::ReviewError;
use crate::store::{GameStore, StoredReview};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Create the review tables if they are missing.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_games (
    id          BIGSERIAL PRIMARY KEY,
    pgn         TEXT,
    moves       JSONB,
    analyzed_at TIMESTAMPTZ,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS game_reviews (
    id           BIGSERIAL PRIMARY KEY,
    game_id      BIGINT NOT NULL UNIQUE REFERENCES user_games(id) ON DELETE CASCADE,
    depth_preset TEXT NOT NULL,
    white_accuracy DOUBLE PRECISION NOT NULL,
    black_accuracy DOUBLE PRECISION NOT NULL,
    review       JSONB NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_game_reviews_game_id
    ON game_reviews (game_id);
"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and migrate.
    pub async fn connect(database_url: &str) -> Result<Self, ReviewError> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        info!("Connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl GameStore for PgStore {
    async fn fetch_game(&self, game_id: i64) -> Result<Option<GameRecord>, ReviewError> {
        let row: Option<(i64, Option<String>, Option<JsonValue>)> =
            sqlx::query_as("SELECT id, pgn, moves FROM user_games WHERE id = $1")
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, pgn, moves)) = row else {
            return Ok(None);
        };
        let moves: Vec<String> = match moves {
            Some(JsonValue::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ReviewError::MalformedGameRecord(format!("game {id} moves column: {e}"))
            })?,
        };
        Ok(Some(GameRecord { id, pgn, moves }))
    }

    async fn find_review(&self, game_id: i64) -> Result<Option<StoredReview>, ReviewError> {
        let row: Option<(i64, JsonValue)> =
            sqlx::query_as("SELECT id, review FROM game_reviews WHERE game_id = $1")
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((id, review)) => Ok(Some(StoredReview {
                id,
                review: serde_json::from_value(review)?,
            })),
            None => Ok(None),
        }
    }

    async fn save_review(&self, review: &GameReview) -> Result<i64, ReviewError> {
        let body = serde_json::to_value(review)?;
        let mut tx = self.pool.begin().await?;

        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"INSERT INTO game_reviews (
                game_id, depth_preset, white_accuracy, black_accuracy, review
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (game_id) DO NOTHING
            RETURNING id"#,
        )
        .bind(review.game_id)
        .bind(review.depth_preset.as_str())
        .bind(review.white.accuracy)
        .bind(review.black.accuracy)
        .bind(&body)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match inserted {
            Some((id,)) => id,
            None => {
                let (id,): (i64,) =
                    sqlx::query_as("SELECT id FROM game_reviews WHERE game_id = $1")
                        .bind(review.game_id)
                        .fetch_one(&mut *tx)
                        .await?;
                id
            }
        };

        // Mark game as analyzed
        sqlx::query("UPDATE user_games SET analyzed_at = $2 WHERE id = $1")
            .bind(review.game_id)
            .bind(review.analyzed_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Postgres"]
    async fn test_round_trip_against_database() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PgStore::connect(&url).await.unwrap();
        let (game_id,): (i64,) =
            sqlx::query_as("INSERT INTO user_games (moves) VALUES ('[\"e4\",\"e5\"]') RETURNING id")
                .fetch_one(&store.pool)
                .await
                .unwrap();

        let game = store.fetch_game(game_id).await.unwrap().unwrap();
        assert_eq!(game.moves, vec!["e4", "e5"]);
        assert!(store.find_review(game_id).await.unwrap().is_none());
    }
}
