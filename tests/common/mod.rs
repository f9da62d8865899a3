#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chess_core::{position_key, replay};
use review_worker::stockfish::terminal_result;
use review_worker::{
    Evaluator, EvaluatorResult, GameAnalyzer, MemoryStore, OpeningBook, ReviewError, Score,
    TheoryDatabase, TheoryEntry,
};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub type TestAnalyzer = GameAnalyzer<FakeEvaluator, FakeTheory, MemoryStore>;

pub fn moves(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// FEN after playing `list` from the start position.
pub fn fen_after(list: &[&str]) -> String {
    if list.is_empty() {
        return START.to_string();
    }
    let plies = replay(&moves(list)).unwrap();
    plies.last().unwrap().fen_after.clone()
}

pub fn eval(score: Score, best_move: Option<&str>) -> EvaluatorResult {
    EvaluatorResult {
        best_move: best_move.map(str::to_string),
        principal_line: best_move.map(|m| vec![m.to_string()]).unwrap_or_default(),
        score,
        depth: 12,
        runner_up: None,
    }
}

/// Answers from a script keyed by position; unscripted positions get a
/// quiet +0.20 with no best move, or the local terminal verdict.
#[derive(Clone, Default)]
pub struct FakeEvaluator {
    script: HashMap<String, EvaluatorResult>,
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl FakeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fen: &str, result: EvaluatorResult) -> Self {
        self.script.insert(position_key(fen), result);
        self
    }

    /// Fail every call after the first `n`.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Evaluator for FakeEvaluator {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvaluatorResult, ReviewError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| n >= limit) {
            return Err(ReviewError::Evaluator("engine crashed".into()));
        }
        if let Some(result) = self.script.get(&position_key(fen)) {
            return Ok(result.clone());
        }
        let pos: Chess = fen
            .parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap();
        Ok(terminal_result(&pos).unwrap_or(EvaluatorResult {
            depth,
            ..eval(Score::Centipawns(20), None)
        }))
    }
}

/// In-memory theory keyed by position; counts lookups.
#[derive(Clone, Default)]
pub struct FakeTheory {
    entries: HashMap<String, TheoryEntry>,
    calls: Arc<AtomicUsize>,
    down: bool,
}

impl FakeTheory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `sans` as theory after the moves in `line`.
    pub fn with(mut self, line: &[&str], sans: &[&str]) -> Self {
        let entry = TheoryEntry {
            total_games: 100 * sans.len() as u64,
            moves: sans.iter().map(|s| (s.to_string(), 100)).collect(),
        };
        self.entries.insert(position_key(&fen_after(line)), entry);
        self
    }

    pub fn unreachable() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TheoryDatabase for FakeTheory {
    fn is_remote(&self) -> bool {
        false
    }

    async fn lookup(&self, fen: &str) -> Result<TheoryEntry, ReviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(ReviewError::ExternalLookup("HTTP 503".into()));
        }
        Ok(self.entries.get(&position_key(fen)).cloned().unwrap_or_default())
    }
}

pub fn analyzer(evaluator: FakeEvaluator, theory: FakeTheory) -> TestAnalyzer {
    GameAnalyzer::new(
        evaluator,
        OpeningBook::with_throttle(theory, Duration::ZERO),
        MemoryStore::new(),
    )
}
