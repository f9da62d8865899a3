//! The engine boundary: scores, search results, and depth presets.

use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::error::ReviewError;
use crate::thresholds::{MATE_SCORE, MATE_THRESHOLD};

/// Mate distances past this fold to the same centipawn value.
const MAX_MATE_DISTANCE: i32 = (MATE_SCORE - MATE_THRESHOLD) / 10 - 1;

/// Engine score, always from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Positive = White is better.
    Centipawns(i32),
    /// Mate in N moves (positive = White mates, negative = Black mates).
    Mate(i32),
    /// The given side is checkmated on the board.
    Mated(#[serde(with = "color_name")] Color),
}

impl Score {
    /// Fold into centipawns; mates land beyond [`MATE_THRESHOLD`] however
    /// long they are.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Centipawns(cp) => cp,
            Score::Mate(m) if m >= 0 => MATE_SCORE - m.min(MAX_MATE_DISTANCE) * 10,
            Score::Mate(m) => -MATE_SCORE - m.max(-MAX_MATE_DISTANCE) * 10,
            Score::Mated(Color::White) => -MATE_SCORE,
            Score::Mated(Color::Black) => MATE_SCORE,
        }
    }

    /// Same score seen from `side`.
    pub fn for_side(self, side: Color) -> Score {
        match (side, self) {
            (Color::White, s) => s,
            (Color::Black, Score::Centipawns(cp)) => Score::Centipawns(-cp),
            (Color::Black, Score::Mate(m)) => Score::Mate(-m),
            (Color::Black, Score::Mated(c)) => Score::Mated(c.other()),
        }
    }

    /// Mate distance from `side`'s point of view, if the score is a mate.
    pub fn mate_for(self, side: Color) -> Option<Mate> {
        match self.for_side(side) {
            Score::Mate(m) if m > 0 => Some(Mate::For(m as u32)),
            Score::Mate(m) if m < 0 => Some(Mate::Against(m.unsigned_abs())),
            Score::Mated(Color::Black) => Some(Mate::For(0)),
            Score::Mated(Color::White) => Some(Mate::Against(0)),
            _ => None,
        }
    }

    pub fn is_mate(self) -> bool {
        self.centipawns().abs() > MATE_THRESHOLD
    }
}

mod color_name {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use shakmaty::Color;

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if color.is_white() { "white" } else { "black" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        match String::deserialize(d)?.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(de::Error::unknown_variant(other, &["white", "black"])),
        }
    }
}

/// A forced mate relative to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mate {
    /// This side mates in N (0 = mate already delivered).
    For(u32),
    /// This side gets mated in N.
    Against(u32),
}

/// Longest principal line kept per evaluation.
pub const MAX_LINE_LEN: usize = 10;

/// Result of one engine query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResult {
    /// Best move in UCI notation; `None` when the side to move has no moves.
    pub best_move: Option<String>,
    pub principal_line: Vec<String>,
    pub score: Score,
    pub depth: u32,
    /// Score of the second-best line, when the engine reported one.
    pub runner_up: Option<Score>,
}

/// Anything that can score a position at a given search depth.
///
/// Calls on one handle are strictly sequential; a call resolves once the
/// search has finished or failed.
pub trait Evaluator: Send {
    fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<EvaluatorResult, ReviewError>> + Send;
}

/// Named search budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPreset {
    Fast,
    #[default]
    Balanced,
    Thorough,
}

impl DepthPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            DepthPreset::Fast => "fast",
            DepthPreset::Balanced => "balanced",
            DepthPreset::Thorough => "thorough",
        }
    }

    pub fn depth(self) -> u32 {
        match self {
            DepthPreset::Fast => 10,
            DepthPreset::Balanced => 15,
            DepthPreset::Thorough => 20,
        }
    }

    /// Rough wall-clock cost of analyzing one game at this preset.
    pub fn estimated_secs(self) -> u64 {
        match self {
            DepthPreset::Fast => 45,
            DepthPreset::Balanced => 90,
            DepthPreset::Thorough => 180,
        }
    }
}

impl FromStr for DepthPreset {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(DepthPreset::Fast),
            "balanced" => Ok(DepthPreset::Balanced),
            "thorough" => Ok(DepthPreset::Thorough),
            _ => Err(ReviewError::Config("unknown depth preset")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_folds_beyond_threshold() {
        assert_eq!(Score::Mate(3).centipawns(), 9970);
        assert_eq!(Score::Mate(-3).centipawns(), -9970);
        assert!(Score::Mate(40).is_mate());
        assert!(!Score::Centipawns(850).is_mate());
    }

    #[test]
    fn test_long_mates_stay_mates() {
        for m in [99, 100, 250, i32::MAX] {
            assert!(Score::Mate(m).is_mate(), "mate in {m}");
            assert!(Score::Mate(-m).is_mate(), "mated in {m}");
            assert_eq!(Score::Mate(m).mate_for(Color::White), Some(Mate::For(m as u32)));
        }
        assert_eq!(Score::Mate(i32::MAX).centipawns(), 9010);
        assert_eq!(Score::Mate(i32::MIN + 1).centipawns(), -9010);
        assert_eq!(crate::win_probability::win_chance(Score::Mate(500), Color::White), 1.0);
        assert_eq!(crate::win_probability::win_chance(Score::Mate(500), Color::Black), 0.0);
    }

    #[test]
    fn test_for_side_flips_black() {
        assert_eq!(Score::Centipawns(120).for_side(Color::Black), Score::Centipawns(-120));
        assert_eq!(Score::Mate(2).for_side(Color::Black), Score::Mate(-2));
        assert_eq!(Score::Mate(2).for_side(Color::White), Score::Mate(2));
    }

    #[test]
    fn test_mate_for() {
        assert_eq!(Score::Mate(4).mate_for(Color::White), Some(Mate::For(4)));
        assert_eq!(Score::Mate(4).mate_for(Color::Black), Some(Mate::Against(4)));
        assert_eq!(Score::Centipawns(300).mate_for(Color::White), None);
        assert_eq!(Score::Mated(Color::White).mate_for(Color::Black), Some(Mate::For(0)));
        assert_eq!(Score::Mated(Color::White).mate_for(Color::White), Some(Mate::Against(0)));
        assert_eq!(Score::Mated(Color::Black).centipawns(), 10_000);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("Fast".parse::<DepthPreset>().unwrap(), DepthPreset::Fast);
        assert_eq!("thorough".parse::<DepthPreset>().unwrap().depth(), 20);
        assert!("deep".parse::<DepthPreset>().is_err());
        assert_eq!(DepthPreset::default(), DepthPreset::Balanced);
    }
}
