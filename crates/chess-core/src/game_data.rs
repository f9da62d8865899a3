use serde::{Deserialize, Serialize};

use crate::pgn::{self, PgnError};

/// A stored game as handed to the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub pgn: Option<String>,
    pub moves: Vec<String>, // SAN notation
}

impl GameRecord {
    pub fn from_moves(id: i64, moves: &[&str]) -> Self {
        Self {
            id,
            pgn: None,
            moves: moves.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_pgn(id: i64, pgn: &str) -> Self {
        Self {
            id,
            pgn: Some(pgn.to_string()),
            moves: Vec::new(),
        }
    }

    /// SAN moves of the game, falling back to the PGN movetext when no
    /// explicit move list was stored.
    pub fn san_moves(&self) -> Result<Vec<String>, PgnError> {
        if !self.moves.is_empty() {
            return Ok(self.moves.clone());
        }
        match self.pgn.as_deref() {
            Some(pgn) => pgn::extract_moves(pgn),
            None => Ok(Vec::new()),
        }
    }
}
