//! Game analysis: one pass over the move list, scoring every ply against
//! the engine and folding the classifications into per-player summaries.

use std::future::Future;

use chess_core::{position_key, replay, Ply};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{classify, is_missed_opportunity, Classification, MoveSignal};
use crate::error::ReviewError;
use crate::evaluator::{DepthPreset, Evaluator, EvaluatorResult, Mate};
use crate::opening_book::{OpeningBook, TheoryDatabase};
use crate::position::{after_reply, detect_sacrifice, game_phase, GamePhase};
use crate::scheduler::JobRunner;
use crate::store::{GameStore, StoredReview};
use crate::summary::{CombinedSummary, PlayerSummary, SummaryBuilder};
use crate::thresholds::{MissPolicy, ONLY_MOVE_GAP};
use crate::win_probability::{adjust_for_mate_distance, expected_points_lost, win_chance};

/// The stored verdict on one ply. Evaluations and win chances are from
/// the mover's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    pub ply: usize,
    pub move_number: u32,
    pub is_white: bool,
    pub san: String,
    pub uci: String,
    /// Position key after the move.
    pub position_after: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub mate_before: Option<Mate>,
    pub mate_after: Option<Mate>,
    pub win_chance_before: f64,
    pub win_chance_after: f64,
    pub expected_points_lost: f64,
    pub classification: Classification,
    pub is_book: bool,
    pub game_phase: GamePhase,
    pub best_move: Option<String>,
    pub best_line: Vec<String>,
    pub is_sacrifice: bool,
    pub is_only_good_move: bool,
    pub is_critical: bool,
}

/// Full review of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReview {
    pub game_id: i64,
    pub depth_preset: DepthPreset,
    pub moves: Vec<MoveAnalysis>,
    pub white: PlayerSummary,
    pub black: PlayerSummary,
    pub combined: CombinedSummary,
    pub analyzed_at: DateTime<Utc>,
}

/// Traversal state carried from one ply to the next.
struct GameWalk {
    /// Cleared on the first ply that is not theory; never set again.
    still_in_book: bool,
    /// Engine verdict on the position the next ply is played from.
    current: EvaluatorResult,
    summary: SummaryBuilder,
    moves: Vec<MoveAnalysis>,
}

pub struct GameAnalyzer<E, T, S> {
    evaluator: tokio::sync::Mutex<E>,
    book: OpeningBook<T>,
    store: S,
    miss_policy: MissPolicy,
}

impl<E, T, S> GameAnalyzer<E, T, S>
where
    E: Evaluator,
    T: TheoryDatabase,
    S: GameStore,
{
    pub fn new(evaluator: E, book: OpeningBook<T>, store: S) -> Self {
        Self {
            evaluator: tokio::sync::Mutex::new(evaluator),
            book,
            store,
            miss_policy: MissPolicy::default(),
        }
    }

    pub fn with_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn evaluator(&self) -> &tokio::sync::Mutex<E> {
        &self.evaluator
    }

    /// Review a game, or return the stored review if one exists.
    pub async fn analyze(&self, game_id: i64, preset: DepthPreset) -> Result<StoredReview, ReviewError> {
        if let Some(existing) = self.store.find_review(game_id).await? {
            info!(game_id, review_id = existing.id, "Game already analyzed");
            return Ok(existing);
        }

        let game = self
            .store
            .fetch_game(game_id)
            .await?
            .ok_or(ReviewError::NotFound(game_id))?;
        let san_moves = game.san_moves()?;
        if san_moves.is_empty() {
            return Err(ReviewError::EmptyGame(game_id));
        }
        let plies = replay(&san_moves)?;

        info!(game_id, plies = plies.len(), preset = preset.as_str(), "Starting analysis");
        let depth = preset.depth();
        let mut evaluator = self.evaluator.lock().await;

        let start_fen = plies[0].fen_before.clone();
        let mut walk = GameWalk {
            still_in_book: true,
            current: evaluator.evaluate(&start_fen, depth).await?,
            summary: SummaryBuilder::default(),
            moves: Vec::with_capacity(plies.len()),
        };

        for ply in &plies {
            let after = evaluator.evaluate(&ply.fen_after, depth).await?;
            self.step(&mut walk, ply, after).await;
        }
        drop(evaluator);

        let (white, black, combined) = walk.summary.finish();
        let review = GameReview {
            game_id,
            depth_preset: preset,
            moves: walk.moves,
            white,
            black,
            combined,
            analyzed_at: Utc::now(),
        };
        let id = self.store.save_review(&review).await?;

        info!(
            game_id,
            review_id = id,
            white_accuracy = review.white.accuracy,
            black_accuracy = review.black.accuracy,
            "Analysis complete"
        );
        Ok(StoredReview { id, review })
    }

    /// Classify one ply and fold it into the walk.
    async fn step(&self, walk: &mut GameWalk, ply: &Ply, after: EvaluatorResult) {
        let before = std::mem::replace(&mut walk.current, after);
        let after = &walk.current;
        let mover = ply.mover();

        let win_before = win_chance(before.score, mover);
        let win_after = win_chance(after.score, mover);
        let mate_before = before.score.mate_for(mover);
        let mate_after = after.score.mate_for(mover);
        let epl = adjust_for_mate_distance(
            expected_points_lost(win_before, win_after),
            mate_before,
            mate_after,
        );

        let is_best_move = before.best_move.as_deref() == Some(ply.uci.as_str());
        let only_good_move = is_best_move
            && before
                .runner_up
                .map_or(true, |second| win_before - win_chance(second, mover) >= ONLY_MOVE_GAP);
        let settled = after_reply(&ply.after, after.best_move.as_deref());
        let is_sacrifice = detect_sacrifice(&ply.before, &settled, mover);
        let phase = game_phase(ply.index, &ply.before);
        let missed_opportunity = is_missed_opportunity(
            before.score.for_side(mover),
            after.score.for_side(mover),
            is_best_move,
            epl,
            &self.miss_policy,
        );

        let is_book = if walk.still_in_book && phase == GamePhase::Opening {
            let hit = self.book.is_book_move(&ply.fen_before, &ply.san).await;
            if !hit {
                debug!(ply = ply.index, san = %ply.san, "Left opening book");
                walk.still_in_book = false;
            }
            hit
        } else {
            false
        };

        let signal = MoveSignal {
            win_chance_before: win_before,
            win_chance_after: win_after,
            expected_points_lost: epl,
            is_sacrifice,
            is_best_move,
            all_alternatives_worse: only_good_move,
            missed_opportunity,
            mate_before,
            mate_after,
            game_phase: phase,
            is_book_move: is_book,
        };
        let classification = if is_book {
            Classification::Book
        } else {
            classify(&signal)
        };
        let is_critical = walk.summary.record(mover, classification, epl);

        debug!(
            ply = ply.index,
            san = %ply.san,
            %classification,
            epl,
            "Classified move"
        );

        walk.moves.push(MoveAnalysis {
            ply: ply.index,
            move_number: ply.move_number(),
            is_white: mover.is_white(),
            san: ply.san.clone(),
            uci: ply.uci.clone(),
            position_after: position_key(&ply.fen_after),
            eval_before: before.score.for_side(mover).centipawns(),
            eval_after: after.score.for_side(mover).centipawns(),
            mate_before,
            mate_after,
            win_chance_before: win_before,
            win_chance_after: win_after,
            expected_points_lost: epl,
            classification,
            is_book,
            game_phase: phase,
            best_move: before.best_move,
            best_line: before.principal_line,
            is_sacrifice,
            is_only_good_move: only_good_move,
            is_critical,
        });
    }
}

impl<E, T, S> JobRunner for GameAnalyzer<E, T, S>
where
    E: Evaluator + 'static,
    T: TheoryDatabase + 'static,
    S: GameStore + 'static,
{
    fn run(
        &self,
        game_id: i64,
        preset: DepthPreset,
    ) -> impl Future<Output = Result<i64, ReviewError>> + Send {
        async move { self.analyze(game_id, preset).await.map(|stored| stored.id) }
    }
}
