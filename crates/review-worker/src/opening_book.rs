//! Opening-book oracle: is a position or move known theory?
//!
//! Answers are memoized per session, keyed by position and separately by
//! position + move. Remote lookups are throttled. A failed lookup is never
//! an error for the caller: it degrades to "not book" and is not cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chess_core::position_key;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::book_cache::LocalBook;
use crate::error::ReviewError;
use crate::explorer::ExplorerClient;

/// Default gap between two outbound lookups.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(70);

/// What a theory database knows about one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TheoryEntry {
    pub total_games: u64,
    /// SAN (without check suffix) -> games played.
    pub moves: HashMap<String, u64>,
}

/// Source of opening theory, queried by FEN.
pub trait TheoryDatabase: Send + Sync {
    /// Remote databases are rate limited by the oracle.
    fn is_remote(&self) -> bool {
        true
    }

    fn lookup(&self, fen: &str) -> impl Future<Output = Result<TheoryEntry, ReviewError>> + Send;
}

/// Theory backend picked at startup.
pub enum TheorySource {
    Local(LocalBook),
    Explorer(ExplorerClient),
}

impl TheoryDatabase for TheorySource {
    fn is_remote(&self) -> bool {
        match self {
            TheorySource::Local(book) => book.is_remote(),
            TheorySource::Explorer(client) => client.is_remote(),
        }
    }

    async fn lookup(&self, fen: &str) -> Result<TheoryEntry, ReviewError> {
        match self {
            TheorySource::Local(book) => book.lookup(fen).await,
            TheorySource::Explorer(client) => client.lookup(fen).await,
        }
    }
}

/// Drop `+`/`#` so engine, PGN and explorer SAN compare equal.
pub fn normalize_san(san: &str) -> &str {
    san.trim_end_matches(['+', '#'])
}

pub struct OpeningBook<T> {
    db: T,
    throttle: Duration,
    positions: Mutex<HashMap<String, bool>>,
    moves: Mutex<HashMap<(String, String), bool>>,
    last_call: tokio::sync::Mutex<Option<Instant>>,
}

impl<T: TheoryDatabase> OpeningBook<T> {
    pub fn new(db: T) -> Self {
        Self::with_throttle(db, DEFAULT_THROTTLE)
    }

    pub fn with_throttle(db: T, throttle: Duration) -> Self {
        Self {
            db,
            throttle,
            positions: Mutex::new(HashMap::new()),
            moves: Mutex::new(HashMap::new()),
            last_call: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn is_book_position(&self, fen: &str) -> bool {
        let key = position_key(fen);
        if let Some(&hit) = lock(&self.positions).get(&key) {
            return hit;
        }
        match self.fetch(&key).await {
            Some(entry) => entry.total_games > 0,
            None => false,
        }
    }

    pub async fn is_book_move(&self, fen: &str, san: &str) -> bool {
        let key = position_key(fen);
        let san = normalize_san(san).to_string();
        let cache_key = (key, san);
        if let Some(&hit) = lock(&self.moves).get(&cache_key) {
            return hit;
        }
        match self.fetch(&cache_key.0).await {
            Some(entry) => {
                let hit = entry.moves.get(&cache_key.1).is_some_and(|&games| games > 0);
                lock(&self.moves).insert(cache_key, hit);
                hit
            }
            None => false,
        }
    }

    /// Number of memoized (positions, moves).
    pub fn cached(&self) -> (usize, usize) {
        (lock(&self.positions).len(), lock(&self.moves).len())
    }

    /// Query the database and record the answer for the position and every
    /// move it lists.
    async fn fetch(&self, key: &str) -> Option<TheoryEntry> {
        let result = if self.db.is_remote() {
            let mut last = self.last_call.lock().await;
            if let Some(at) = *last {
                let next = at + self.throttle;
                if next > Instant::now() {
                    tokio::time::sleep_until(next).await;
                }
            }
            let result = self.db.lookup(key).await;
            *last = Some(Instant::now());
            result
        } else {
            self.db.lookup(key).await
        };

        match result {
            Ok(entry) => {
                debug!(key, total_games = entry.total_games, "Book lookup");
                lock(&self.positions).insert(key.to_string(), entry.total_games > 0);
                let mut moves = lock(&self.moves);
                for (san, &games) in &entry.moves {
                    moves.insert((key.to_string(), san.clone()), games > 0);
                }
                Some(entry)
            }
            Err(e) => {
                warn!(key, error = %e, "Opening book lookup failed, treating as not book");
                None
            }
        }
    }
}

fn lock<V>(m: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
