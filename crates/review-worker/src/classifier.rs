//! Move classification, pure functions only
//! (no board, engine or store dependencies)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evaluator::{Mate, Score};
use crate::position::{is_competitive, is_losing, is_winning, GamePhase};
use crate::thresholds::{
    MissPolicy, BEST_EPSILON, BLUNDER_MIN_EPL, DECISIVE_HIGH, DECISIVE_LOW, EXCELLENT_MAX_EPL,
    GOOD_MAX_EPL, INACCURACY_MIN_EPL, MISTAKE_MIN_EPL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Brilliant,
    Great,
    Best,
    Excellent,
    Good,
    Book,
    Inaccuracy,
    Mistake,
    Blunder,
    Miss,
    MissedMate,
}

impl Classification {
    pub const ALL: [Classification; 11] = [
        Classification::Brilliant,
        Classification::Great,
        Classification::Best,
        Classification::Excellent,
        Classification::Good,
        Classification::Book,
        Classification::Inaccuracy,
        Classification::Mistake,
        Classification::Blunder,
        Classification::Miss,
        Classification::MissedMate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Brilliant => "brilliant",
            Classification::Great => "great",
            Classification::Best => "best",
            Classification::Excellent => "excellent",
            Classification::Good => "good",
            Classification::Book => "book",
            Classification::Inaccuracy => "inaccuracy",
            Classification::Mistake => "mistake",
            Classification::Blunder => "blunder",
            Classification::Miss => "miss",
            Classification::MissedMate => "missed_mate",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the classifier needs to know about one ply. Win chances and
/// mates are from the mover's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSignal {
    pub win_chance_before: f64,
    pub win_chance_after: f64,
    pub expected_points_lost: f64,
    pub is_sacrifice: bool,
    pub is_best_move: bool,
    pub all_alternatives_worse: bool,
    pub missed_opportunity: bool,
    pub mate_before: Option<Mate>,
    pub mate_after: Option<Mate>,
    pub game_phase: GamePhase,
    pub is_book_move: bool,
}

/// Classify a move. Rules are tried in order and the first match wins:
/// missed mate, miss, brilliant, great, the error tiers (suppressed in
/// decided positions), then the good tiers on raw EPL.
pub fn classify(signal: &MoveSignal) -> Classification {
    let epl = signal.expected_points_lost;
    let before = signal.win_chance_before;
    let after = signal.win_chance_after;

    if matches!(signal.mate_before, Some(Mate::For(_))) && signal.mate_after.is_none() {
        return Classification::MissedMate;
    }

    if signal.missed_opportunity {
        return Classification::Miss;
    }

    if signal.is_sacrifice
        && epl <= EXCELLENT_MAX_EPL
        && is_competitive(before)
        && !is_winning(before)
        && (signal.game_phase != GamePhase::Endgame || signal.all_alternatives_worse)
    {
        return Classification::Brilliant;
    }

    let crossed_boundary = (is_losing(before) && is_competitive(after))
        || (is_competitive(before) && is_winning(after));
    if epl <= EXCELLENT_MAX_EPL && signal.all_alternatives_worse && crossed_boundary {
        return Classification::Great;
    }

    // A forced mate handed over to the opponent is never excused as decided.
    let mate_flipped = matches!(signal.mate_before, Some(Mate::For(_)))
        && matches!(signal.mate_after, Some(Mate::Against(_)));
    let decided = !mate_flipped && (before >= DECISIVE_HIGH || before <= DECISIVE_LOW);
    let effective_epl = if decided { 0.0 } else { epl };
    if effective_epl >= BLUNDER_MIN_EPL {
        return Classification::Blunder;
    }
    if effective_epl >= MISTAKE_MIN_EPL {
        return Classification::Mistake;
    }
    if effective_epl >= INACCURACY_MIN_EPL {
        return Classification::Inaccuracy;
    }

    if signal.is_best_move && epl < BEST_EPSILON {
        Classification::Best
    } else if epl <= EXCELLENT_MAX_EPL {
        Classification::Excellent
    } else if epl <= GOOD_MAX_EPL {
        Classification::Good
    } else {
        Classification::Inaccuracy
    }
}

/// A much stronger line was available, but the played move kept the game
/// level without itself costing much. Scores are from the mover's side.
pub fn is_missed_opportunity(
    best: Score,
    played: Score,
    is_best_move: bool,
    epl: f64,
    policy: &MissPolicy,
) -> bool {
    if is_best_move || epl >= policy.max_epl {
        return false;
    }
    let big_advantage = match best {
        Score::Centipawns(cp) => cp >= policy.best_min_cp,
        mate => mate.centipawns() > 0,
    };
    let stayed_level = match played {
        Score::Centipawns(cp) => cp.abs() <= policy.equal_band_cp,
        _ => false,
    };
    big_advantage && stayed_level
}

/// Accuracy percentage from an average EPL.
pub fn calculate_accuracy(average_epl: f64) -> f64 {
    (100.0 * (1.0 - average_epl)).clamp(0.0, 100.0)
}
