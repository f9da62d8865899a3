//! Per-player and combined tallies folded from classified moves.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::classifier::{calculate_accuracy, Classification};
use crate::thresholds::CRITICAL_MIN_EPL;

/// One counter per classification tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub brilliant: u32,
    pub great: u32,
    pub best: u32,
    pub excellent: u32,
    pub good: u32,
    pub book: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
    pub miss: u32,
    pub missed_mate: u32,
}

impl ClassificationCounts {
    pub fn add(&mut self, class: Classification) {
        *self.slot(class) += 1;
    }

    pub fn get(&self, class: Classification) -> u32 {
        match class {
            Classification::Brilliant => self.brilliant,
            Classification::Great => self.great,
            Classification::Best => self.best,
            Classification::Excellent => self.excellent,
            Classification::Good => self.good,
            Classification::Book => self.book,
            Classification::Inaccuracy => self.inaccuracy,
            Classification::Mistake => self.mistake,
            Classification::Blunder => self.blunder,
            Classification::Miss => self.miss,
            Classification::MissedMate => self.missed_mate,
        }
    }

    pub fn total(&self) -> u32 {
        Classification::ALL.iter().map(|&c| self.get(c)).sum()
    }

    fn slot(&mut self, class: Classification) -> &mut u32 {
        match class {
            Classification::Brilliant => &mut self.brilliant,
            Classification::Great => &mut self.great,
            Classification::Best => &mut self.best,
            Classification::Excellent => &mut self.excellent,
            Classification::Good => &mut self.good,
            Classification::Book => &mut self.book,
            Classification::Inaccuracy => &mut self.inaccuracy,
            Classification::Mistake => &mut self.mistake,
            Classification::Blunder => &mut self.blunder,
            Classification::Miss => &mut self.miss,
            Classification::MissedMate => &mut self.missed_mate,
        }
    }
}

/// Tallies for one side. Book moves only bump `counts.book`; they are
/// left out of `moves` and the EPL totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub counts: ClassificationCounts,
    pub moves: u32,
    pub total_expected_points_lost: f64,
    pub average_epl: f64,
    pub accuracy: f64,
}

impl PlayerSummary {
    pub fn record(&mut self, class: Classification, epl: f64) {
        self.counts.add(class);
        if class == Classification::Book {
            return;
        }
        self.moves += 1;
        self.total_expected_points_lost += epl;
        self.average_epl = self.total_expected_points_lost / f64::from(self.moves);
        self.accuracy = calculate_accuracy(self.average_epl);
    }
}

/// Both sides summed, plus the number of critical moments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedSummary {
    #[serde(flatten)]
    pub totals: PlayerSummary,
    pub critical_moments: u32,
}

/// A ply that decided or could have decided the game.
pub fn is_critical(class: Classification, epl: f64) -> bool {
    epl >= CRITICAL_MIN_EPL || matches!(class, Classification::Brilliant | Classification::Great)
}

/// Running fold of a game's classifications.
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    white: PlayerSummary,
    black: PlayerSummary,
    combined: CombinedSummary,
}

impl SummaryBuilder {
    /// Fold one ply. Returns whether it counts as a critical moment.
    pub fn record(&mut self, mover: Color, class: Classification, epl: f64) -> bool {
        let side = match mover {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        side.record(class, epl);
        self.combined.totals.record(class, epl);

        let critical = class != Classification::Book && is_critical(class, epl);
        if critical {
            self.combined.critical_moments += 1;
        }
        critical
    }

    pub fn finish(self) -> (PlayerSummary, PlayerSummary, CombinedSummary) {
        (self.white, self.black, self.combined)
    }
}
