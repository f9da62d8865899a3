//! Shared classification thresholds.
//!
//! Win chances and EPL values are fractions in [0, 1].

/// Mate scores are folded into centipawns beyond this magnitude.
pub const MATE_THRESHOLD: i32 = 9000;

/// Base centipawn value of a mate score; shorter mates score higher.
pub const MATE_SCORE: i32 = 10_000;

/// EPL ceiling for an "excellent" move (also gates brilliant/great).
pub const EXCELLENT_MAX_EPL: f64 = 0.02;
/// EPL ceiling for a "good" move; also the inaccuracy floor.
pub const GOOD_MAX_EPL: f64 = 0.05;
pub const INACCURACY_MIN_EPL: f64 = 0.05;
pub const MISTAKE_MIN_EPL: f64 = 0.10;
pub const BLUNDER_MIN_EPL: f64 = 0.20;

/// Below this EPL the engine's top move counts as "best".
pub const BEST_EPSILON: f64 = 0.001;

/// Win-chance gap between the best and runner-up line for the best move to
/// count as the only good move.
pub const ONLY_MOVE_GAP: f64 = 0.10;

/// Critical moments in the combined summary.
pub const CRITICAL_MIN_EPL: f64 = 0.15;

/// Position character bands.
pub const COMPETITIVE_MIN: f64 = 0.20;
pub const COMPETITIVE_MAX: f64 = 0.80;
pub const WINNING_ABOVE: f64 = 0.75;
pub const LOSING_BELOW: f64 = 0.25;

/// Decisive bands: error tiers are suppressed when the pre-move win chance is
/// at or beyond these.
pub const DECISIVE_HIGH: f64 = 0.80;
pub const DECISIVE_LOW: f64 = 0.20;

/// Heuristic for the "miss" classification. The cutoffs are policy, not
/// derived values, so they are configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissPolicy {
    /// Best line must be at least this good for the mover (or a mate).
    pub best_min_cp: i32,
    /// Played move must leave the position within this band of equality.
    pub equal_band_cp: i32,
    /// Played move's own EPL must stay under this.
    pub max_epl: f64,
}

impl Default for MissPolicy {
    fn default() -> Self {
        Self {
            best_min_cp: 150,
            equal_band_cp: 100,
            max_epl: 0.05,
        }
    }
}
