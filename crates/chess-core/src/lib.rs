pub mod game_data;
pub mod pgn;
pub mod replay;

pub use game_data::GameRecord;
pub use pgn::PgnError;
pub use replay::{position_key, replay, to_fen, Ply, ReplayError};
