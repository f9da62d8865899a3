//! Worker error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Game not found: {0}")]
    NotFound(i64),

    #[error("Game {0} has no moves")]
    EmptyGame(i64),

    #[error("Malformed game record: {0}")]
    MalformedGameRecord(String),

    #[error("Evaluator error: {0}")]
    Evaluator(String),

    #[error("Opening book lookup failed: {0}")]
    ExternalLookup(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Opening book file error: {0}")]
    BookFile(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    /// Bad input that will fail the same way on every attempt.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ReviewError::NotFound(_)
                | ReviewError::EmptyGame(_)
                | ReviewError::MalformedGameRecord(_)
        )
    }
}

impl From<chess_core::ReplayError> for ReviewError {
    fn from(e: chess_core::ReplayError) -> Self {
        ReviewError::MalformedGameRecord(e.to_string())
    }
}

impl From<chess_core::PgnError> for ReviewError {
    fn from(e: chess_core::PgnError) -> Self {
        ReviewError::MalformedGameRecord(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_errors() {
        assert!(ReviewError::NotFound(1).is_permanent());
        assert!(ReviewError::EmptyGame(1).is_permanent());
        assert!(ReviewError::MalformedGameRecord("x".into()).is_permanent());
        assert!(!ReviewError::Evaluator("timeout".into()).is_permanent());
        assert!(!ReviewError::ExternalLookup("503".into()).is_permanent());
    }

    #[test]
    fn test_replay_error_is_malformed() {
        let err: ReviewError = chess_core::ReplayError::InvalidSan {
            ply: 3,
            san: "Zz9".to_string(),
        }
        .into();
        assert!(matches!(err, ReviewError::MalformedGameRecord(_)));
        assert!(err.to_string().contains("Zz9"));
    }
}
