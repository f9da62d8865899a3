//! Material, sacrifice, phase and position-character helpers.

use serde::{Deserialize, Serialize};
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, Position, Role};

use crate::thresholds::{COMPETITIVE_MAX, COMPETITIVE_MIN, LOSING_BELOW, WINNING_ABOVE};

// Piece values for material calculation
pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;

/// Last full move that still counts as the opening.
const OPENING_LAST_MOVE: u32 = 12;
/// Combined material at or below which the game is an endgame.
const ENDGAME_MAX_MATERIAL: i32 = 13;
/// Minimum net material given up for a sacrifice.
const SACRIFICE_MIN_LOSS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Piece value (no king)
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Sum of piece values for one side.
pub fn material(pos: &Chess, side: Color) -> i32 {
    let board = pos.board();
    Role::ALL
        .iter()
        .map(|&role| {
            let count = (board.by_color(side) & board.by_role(role)).count() as i32;
            count * piece_value(role)
        })
        .sum()
}

/// Own material minus the opponent's.
pub fn material_balance(pos: &Chess, side: Color) -> i32 {
    material(pos, side) - material(pos, side.other())
}

/// The mover gave up at least two points of material on balance between
/// `before` and `after`. Single pawns are not sacrifices.
pub fn detect_sacrifice(before: &Chess, after: &Chess, mover: Color) -> bool {
    material_balance(before, mover) - material_balance(after, mover) >= SACRIFICE_MIN_LOSS
}

/// Position after the opponent's predicted reply, or `after` itself when the
/// reply is missing or does not parse as a legal move.
pub fn after_reply(after: &Chess, reply_uci: Option<&str>) -> Chess {
    let Some(reply) = reply_uci else {
        return after.clone();
    };
    let mv = reply
        .parse::<UciMove>()
        .ok()
        .and_then(|uci| uci.to_move(after).ok());
    match mv {
        Some(mv) => {
            let mut next = after.clone();
            next.play_unchecked(mv);
            next
        }
        None => after.clone(),
    }
}

/// Phase of the game at a zero-based ply index.
pub fn game_phase(ply_index: usize, pos: &Chess) -> GamePhase {
    let move_number = (ply_index / 2) as u32 + 1;
    if move_number <= OPENING_LAST_MOVE {
        GamePhase::Opening
    } else if material(pos, Color::White) + material(pos, Color::Black) <= ENDGAME_MAX_MATERIAL {
        GamePhase::Endgame
    } else {
        GamePhase::Middlegame
    }
}

pub fn is_competitive(win_chance: f64) -> bool {
    (COMPETITIVE_MIN..=COMPETITIVE_MAX).contains(&win_chance)
}

pub fn is_winning(win_chance: f64) -> bool {
    win_chance > WINNING_ABOVE
}

pub fn is_losing(win_chance: f64) -> bool {
    win_chance < LOSING_BELOW
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::CastlingMode;

    fn pos(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    #[test]
    fn test_start_material() {
        let start = Chess::default();
        assert_eq!(material(&start, Color::White), 39);
        assert_eq!(material(&start, Color::Black), 39);
        assert_eq!(material_balance(&start, Color::White), 0);
    }

    #[test]
    fn test_bishop_for_pawn_is_sacrifice() {
        // Before Bxf7+: even material.
        let before = pos("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 2 3");
        // After Bxf7+ Kxf7: white gave a bishop for a pawn.
        let after = pos("r1bq1bnr/pppp1kpp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQK2R w KQ - 0 4");
        assert!(detect_sacrifice(&before, &after, Color::White));
        assert!(!detect_sacrifice(&before, &after, Color::Black));
    }

    #[test]
    fn test_pawn_loss_is_not_sacrifice() {
        let before = Chess::default();
        let after = pos("rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPP1/RNBQKBNR w KQkq - 0 2");
        assert_eq!(material_balance(&after, Color::White), -1);
        assert!(!detect_sacrifice(&before, &after, Color::White));
    }

    #[test]
    fn test_after_reply_applies_recapture() {
        let after_bxf7 = pos("r1bqkbnr/pppp1Bpp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 0 3");
        let replied = after_reply(&after_bxf7, Some("e8f7"));
        assert_eq!(material(&replied, Color::White), 36);
        // Garbage replies leave the position unchanged.
        let same = after_reply(&after_bxf7, Some("a1a8"));
        assert_eq!(material(&same, Color::White), 39);
        let same = after_reply(&after_bxf7, None);
        assert_eq!(material(&same, Color::White), 39);
    }

    #[test]
    fn test_game_phase() {
        let start = Chess::default();
        assert_eq!(game_phase(0, &start), GamePhase::Opening);
        assert_eq!(game_phase(23, &start), GamePhase::Opening);
        assert_eq!(game_phase(24, &start), GamePhase::Middlegame);
        // Rook and three pawns against three pawns.
        let rook_ending = pos("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 40");
        assert_eq!(game_phase(78, &rook_ending), GamePhase::Endgame);
        assert_eq!(game_phase(4, &rook_ending), GamePhase::Opening);
    }

    #[test]
    fn test_character_bands() {
        assert!(is_competitive(0.20));
        assert!(is_competitive(0.80));
        assert!(!is_competitive(0.81));
        assert!(is_winning(0.76));
        assert!(!is_winning(0.75));
        assert!(is_losing(0.24));
        assert!(!is_losing(0.25));
    }
}
