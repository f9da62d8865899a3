//! Replays a SAN move list from the standard start position.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Invalid SAN at ply {ply}: {san}")]
    InvalidSan { ply: usize, san: String },

    #[error("Illegal move at ply {ply}: {san}")]
    IllegalMove { ply: usize, san: String },
}

/// One half-move with the positions on either side of it.
#[derive(Debug, Clone)]
pub struct Ply {
    /// Zero-based ply index.
    pub index: usize,
    pub san: String,
    pub uci: String,
    pub before: Chess,
    pub after: Chess,
    pub fen_before: String,
    pub fen_after: String,
}

impl Ply {
    /// Side that played this ply.
    pub fn mover(&self) -> Color {
        self.before.turn()
    }

    /// Full-move number this ply belongs to (1-based).
    pub fn move_number(&self) -> u32 {
        (self.index / 2) as u32 + 1
    }
}

/// Replay `moves` from the initial position. Each ply's post-move position is
/// carried forward as the next ply's pre-move position.
pub fn replay(moves: &[String]) -> Result<Vec<Ply>, ReplayError> {
    let mut pos = Chess::default();
    let mut fen = to_fen(&pos);
    let mut plies = Vec::with_capacity(moves.len());

    for (index, raw) in moves.iter().enumerate() {
        let san_str = raw.trim();
        let san: SanPlus = san_str.parse().map_err(|_| ReplayError::InvalidSan {
            ply: index,
            san: san_str.to_string(),
        })?;
        let mv = san.san.to_move(&pos).map_err(|_| ReplayError::IllegalMove {
            ply: index,
            san: san_str.to_string(),
        })?;

        let before = pos.clone();
        pos.play_unchecked(mv.clone());
        let fen_after = to_fen(&pos);

        plies.push(Ply {
            index,
            san: san_str.to_string(),
            uci: mv.to_uci(CastlingMode::Standard).to_string(),
            before,
            after: pos.clone(),
            fen_before: std::mem::replace(&mut fen, fen_after.clone()),
            fen_after,
        });
    }

    Ok(plies)
}

pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
pub fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_replay_scholars_mate() {
        let plies = replay(&moves(&["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"])).unwrap();
        assert_eq!(plies.len(), 7);
        assert_eq!(plies[0].uci, "e2e4");
        assert_eq!(plies[0].mover(), Color::White);
        assert_eq!(plies[1].mover(), Color::Black);
        assert_eq!(plies[6].move_number(), 4);
        assert!(plies[6].after.is_checkmate());
        for pair in plies.windows(2) {
            assert_eq!(pair[0].fen_after, pair[1].fen_before);
        }
    }

    #[test]
    fn test_replay_castling_uci() {
        let plies = replay(&moves(&["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O"])).unwrap();
        assert_eq!(plies[6].uci, "e1g1");
    }

    #[test]
    fn test_replay_rejects_garbage() {
        let err = replay(&moves(&["e4", "zz9"])).unwrap_err();
        assert_eq!(err, ReplayError::InvalidSan { ply: 1, san: "zz9".to_string() });
    }

    #[test]
    fn test_replay_rejects_illegal() {
        let err = replay(&moves(&["e4", "e4"])).unwrap_err();
        assert!(matches!(err, ReplayError::IllegalMove { ply: 1, .. }));
    }

    #[test]
    fn test_position_key_strips_counters() {
        let key = position_key("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        assert_eq!(key, "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -");
    }
}
