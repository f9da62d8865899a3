//! Local opening book backed by a bincode file.
//!
//! Same layout as the exported master-games book: FEN -> (move_san -> stats).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::Path;

use chess_core::position_key;

use crate::error::ReviewError;
use crate::opening_book::{normalize_san, TheoryDatabase, TheoryEntry};

/// Stats for a single book move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMoveStats {
    pub games: i32,
    pub white_wins: i32,
    pub draws: i32,
    pub black_wins: i32,
}

pub type BookTable = HashMap<String, HashMap<String, BookMoveStats>>;

#[derive(Debug, Default)]
pub struct LocalBook {
    table: BookTable,
}

impl LocalBook {
    pub fn new(table: BookTable) -> Self {
        Self { table }
    }

    /// Load the book from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReviewError> {
        let file = File::open(path)?;
        let table: BookTable = bincode::deserialize_from(BufReader::new(file))?;
        let total_moves: usize = table.values().map(|m| m.len()).sum();
        tracing::info!(
            positions = table.len(),
            moves = total_moves,
            "Loaded opening book"
        );
        Ok(Self::new(table))
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn entry(&self, fen: &str) -> TheoryEntry {
        let Some(moves) = self.table.get(&position_key(fen)) else {
            return TheoryEntry::default();
        };
        TheoryEntry {
            total_games: moves.values().map(|s| s.games.max(0) as u64).sum(),
            moves: moves
                .iter()
                .map(|(san, stats)| (normalize_san(san).to_string(), stats.games.max(0) as u64))
                .collect(),
        }
    }
}

impl TheoryDatabase for LocalBook {
    fn is_remote(&self) -> bool {
        false
    }

    fn lookup(&self, fen: &str) -> impl Future<Output = Result<TheoryEntry, ReviewError>> + Send {
        let entry = self.entry(fen);
        async move { Ok(entry) }
    }
}
