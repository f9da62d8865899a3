//! Win-probability model: engine score -> win chance -> expected points lost.

use shakmaty::Color;

use crate::evaluator::{Mate, Score};
use crate::thresholds::MATE_THRESHOLD;

/// Logistic slope, calibrated so that 0 cp maps to 0.5.
pub const WIN_CURVE_K: f64 = 0.003_682_08;

/// EPL floor when a forced mate is thrown away.
const LOST_MATE_EPL: f64 = 0.5;
/// Extra EPL for letting a forced mate drag on.
const SLOWER_MATE_PENALTY: f64 = 0.05;
const SLOWER_MATE_CAP: f64 = 0.10;

/// Win probability for the side the score favours when positive.
pub fn score_to_win_probability(cp: i32) -> f64 {
    if cp > MATE_THRESHOLD {
        return 1.0;
    }
    if cp < -MATE_THRESHOLD {
        return 0.0;
    }
    let x = f64::from(cp);
    let p = 0.5 + 0.5 * (2.0 / (1.0 + (-WIN_CURVE_K * x).exp()) - 1.0);
    p.clamp(0.0, 1.0)
}

/// Win chance of `side` given a White-positive score.
pub fn win_chance(score: Score, side: Color) -> f64 {
    score_to_win_probability(score.for_side(side).centipawns())
}

/// Win probability surrendered by a move. Improvements floor at zero.
pub fn expected_points_lost(before: f64, after: f64) -> f64 {
    (before - after).max(0.0)
}

/// Re-weight EPL for mate transitions, which matter far more to a player
/// than ordinary evaluation drift. Mates are from the mover's point of view.
pub fn adjust_for_mate_distance(epl: f64, before: Option<Mate>, after: Option<Mate>) -> f64 {
    let adjusted = match (before, after) {
        (Some(Mate::For(_)), Some(Mate::Against(_))) => 1.0,
        (Some(Mate::For(_)), None) => epl.max(LOST_MATE_EPL),
        (None, Some(Mate::For(_))) => 0.0,
        (Some(Mate::For(b)), Some(Mate::For(a))) if a > b => {
            (epl + SLOWER_MATE_PENALTY).min(SLOWER_MATE_CAP).max(epl)
        }
        _ => epl,
    };
    adjusted.clamp(0.0, 1.0)
}
