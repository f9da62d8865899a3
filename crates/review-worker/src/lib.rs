pub mod analyzer;
pub mod book_cache;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod explorer;
pub mod opening_book;
pub mod position;
pub mod scheduler;
pub mod stockfish;
pub mod store;
pub mod summary;
pub mod thresholds;
pub mod win_probability;

pub use analyzer::{GameAnalyzer, GameReview, MoveAnalysis};
pub use classifier::{classify, Classification, MoveSignal};
pub use error::ReviewError;
pub use evaluator::{DepthPreset, Evaluator, EvaluatorResult, Mate, Score};
pub use opening_book::{OpeningBook, TheoryDatabase, TheoryEntry};
pub use scheduler::{AnalysisJob, JobRunner, JobStatus, Scheduler};
pub use store::{GameStore, MemoryStore, StoredReview};
