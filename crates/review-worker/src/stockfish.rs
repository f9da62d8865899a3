//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::time::Duration;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Position};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ReviewError;
use crate::evaluator::{Evaluator, EvaluatorResult, Score, MAX_LINE_LEN};

/// Lines requested per search: best plus runner-up.
const MULTI_PV: u32 = 2;
/// Engine output buffered ahead of the reader.
const LINE_BUFFER: usize = 1024;

/// Score as printed by the engine, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawScore {
    Cp(i32),
    Mate(i32),
}

/// The parts of an `info` line we care about.
#[derive(Debug, Clone, PartialEq)]
struct InfoLine {
    multipv: u32,
    depth: u32,
    score: RawScore,
    pv: Vec<String>,
}

/// Stockfish engine instance. A background task forwards every stdout
/// line into a channel; searches consume it until `bestmove`.
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
    reader: JoinHandle<()>,
    timeout: Duration,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn start(path: &str, timeout: Duration) -> Result<Self, ReviewError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReviewError::Evaluator(format!("Failed to spawn Stockfish at {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ReviewError::Evaluator("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| ReviewError::Evaluator("Stockfish stdout unavailable".into()))?;

        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        let reader = tokio::spawn(forward_lines(BufReader::new(stdout), tx));

        let mut engine = Self {
            process,
            stdin,
            lines,
            reader,
            timeout,
        };

        let init = async {
            engine.send("uci").await?;
            engine.wait_for("uciok").await?;
            engine.send("setoption name Threads value 1").await?;
            engine.send("setoption name Hash value 256").await?;
            engine.send(&format!("setoption name MultiPV value {MULTI_PV}")).await?;
            engine.send("isready").await?;
            engine.wait_for("readyok").await
        };
        tokio::time::timeout(timeout, init)
            .await
            .map_err(|_| ReviewError::Evaluator("Stockfish did not finish UCI handshake".into()))??;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), ReviewError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| ReviewError::Evaluator(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ReviewError::Evaluator(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, ReviewError> {
        self.lines
            .recv()
            .await
            .ok_or_else(|| ReviewError::Evaluator("Stockfish closed its output".into()))
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), ReviewError> {
        loop {
            let line = self.read_line().await?;
            debug!(line, "SF >");
            if line == expected {
                return Ok(());
            }
        }
    }

    /// Run one search. Output left over from an abandoned search is
    /// drained by the isready/readyok exchange first.
    async fn search(&mut self, fen: &str, turn: Color, depth: u32) -> Result<EvaluatorResult, ReviewError> {
        self.send("stop").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await?;

        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut lines: Vec<Option<InfoLine>> = vec![None; MULTI_PV as usize];
        let best_move = loop {
            let line = self.read_line().await?;
            if let Some(info) = parse_info_line(&line) {
                let idx = info.multipv.saturating_sub(1) as usize;
                if let Some(slot) = lines.get_mut(idx) {
                    *slot = Some(info);
                }
            } else if let Some(rest) = line.strip_prefix("bestmove") {
                break rest.split_whitespace().next().map(str::to_string);
            }
        };

        let best = lines[0]
            .take()
            .ok_or_else(|| ReviewError::Evaluator(format!("No score reported for {fen}")))?;
        let runner_up = lines[1].take().map(|info| to_white(info.score, turn));
        let best_move = best_move
            .filter(|m| m != "(none)")
            .or_else(|| best.pv.first().cloned());

        let mut principal_line = best.pv;
        principal_line.truncate(MAX_LINE_LEN);

        Ok(EvaluatorResult {
            best_move,
            principal_line,
            score: to_white(best.score, turn),
            depth: best.depth,
            runner_up,
        })
    }

    /// Send quit command and wait for process to exit
    pub async fn stop(&mut self) {
        let _ = self.send("quit").await;
        if tokio::time::timeout(Duration::from_secs(5), self.process.wait())
            .await
            .is_err()
        {
            warn!("Stockfish did not exit after quit, killing");
            let _ = self.process.kill().await;
        }
        self.reader.abort();
    }
}

impl Evaluator for StockfishEngine {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvaluatorResult, ReviewError> {
        let pos = parse_position(fen)?;
        if let Some(result) = terminal_result(&pos) {
            return Ok(result);
        }
        let turn = pos.turn();
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.search(fen, turn, depth)).await {
            Ok(result) => result,
            Err(_) => Err(ReviewError::Evaluator(format!(
                "Stockfish timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
        self.reader.abort();
    }
}

async fn forward_lines(mut stdout: BufReader<ChildStdout>, tx: mpsc::Sender<String>) {
    let mut line = String::new();
    loop {
        line.clear();
        match stdout.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(line.trim().to_string()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from Stockfish");
                break;
            }
        }
    }
}

fn parse_position(fen: &str) -> Result<Chess, ReviewError> {
    let fen: Fen = fen
        .parse()
        .map_err(|e| ReviewError::Evaluator(format!("Invalid FEN {fen}: {e}")))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|e| ReviewError::Evaluator(format!("Illegal position: {e}")))
}

/// Positions with no legal moves are scored without asking the engine.
pub fn terminal_result(pos: &Chess) -> Option<EvaluatorResult> {
    if !pos.legal_moves().is_empty() {
        return None;
    }
    let score = if pos.is_checkmate() {
        Score::Mated(pos.turn())
    } else {
        Score::Centipawns(0)
    };
    Some(EvaluatorResult {
        best_move: None,
        principal_line: Vec::new(),
        score,
        depth: 0,
        runner_up: None,
    })
}

fn to_white(raw: RawScore, turn: Color) -> Score {
    let sign = if turn.is_white() { 1 } else { -1 };
    match raw {
        RawScore::Cp(cp) => Score::Centipawns(cp * sign),
        RawScore::Mate(0) => Score::Mated(turn),
        RawScore::Mate(m) => Score::Mate(m * sign),
    }
}

/// Parse a scored `info` line. Bound-only and `currmove` lines yield `None`.
fn parse_info_line(line: &str) -> Option<InfoLine> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("info") {
        return None;
    }

    let mut multipv = 1;
    let mut depth = 0;
    let mut score = None;
    let mut pv = Vec::new();

    while let Some(token) = parts.next() {
        match token {
            "depth" => depth = parts.next()?.parse().ok()?,
            "multipv" => multipv = parts.next()?.parse().ok()?,
            "score" => {
                let kind = parts.next()?;
                let value: i32 = parts.next()?.parse().ok()?;
                score = match kind {
                    "cp" => Some(RawScore::Cp(value)),
                    "mate" => Some(RawScore::Mate(value)),
                    _ => None,
                };
            }
            "lowerbound" | "upperbound" => return None,
            "pv" => {
                pv = parts.by_ref().map(str::to_string).collect();
            }
            _ => {}
        }
    }

    Some(InfoLine {
        multipv,
        depth,
        score: score?,
        pv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp_line() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4 e7e5 g1f3";
        let info = parse_info_line(line).unwrap();
        assert_eq!(info.depth, 20);
        assert_eq!(info.multipv, 1);
        assert_eq!(info.score, RawScore::Cp(35));
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_parse_mate_line() {
        let line = "info depth 12 multipv 2 score mate -3 nodes 4000 pv d8h4";
        let info = parse_info_line(line).unwrap();
        assert_eq!(info.multipv, 2);
        assert_eq!(info.score, RawScore::Mate(-3));
    }

    #[test]
    fn test_skips_unscored_and_bound_lines() {
        assert!(parse_info_line("info depth 5 currmove e2e4 currmovenumber 1").is_none());
        assert!(parse_info_line("info depth 9 score cp 20 lowerbound pv e2e4").is_none());
        assert!(parse_info_line("info string NNUE evaluation enabled").is_none());
        assert!(parse_info_line("bestmove e2e4 ponder e7e5").is_none());
    }

    #[test]
    fn test_score_without_pv_is_kept() {
        let info = parse_info_line("info depth 1 score cp -12").unwrap();
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_to_white_flips_for_black() {
        assert_eq!(to_white(RawScore::Cp(50), Color::Black), Score::Centipawns(-50));
        assert_eq!(to_white(RawScore::Mate(2), Color::Black), Score::Mate(-2));
        assert_eq!(to_white(RawScore::Mate(0), Color::White), Score::Mated(Color::White));
        assert_eq!(to_white(RawScore::Cp(50), Color::White), Score::Centipawns(50));
    }

    #[test]
    fn test_terminal_positions() {
        let mated = parse_position("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let result = terminal_result(&mated).unwrap();
        assert_eq!(result.score, Score::Mated(Color::White));
        assert!(result.best_move.is_none());

        let stalemate = parse_position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(terminal_result(&stalemate).unwrap().score, Score::Centipawns(0));

        assert!(terminal_result(&Chess::default()).is_none());
    }

    #[tokio::test]
    #[ignore = "requires Stockfish"]
    async fn test_engine_finds_mate_in_one() {
        let path = std::env::var("STOCKFISH_PATH").unwrap_or_else(|_| "stockfish".into());
        let mut engine = StockfishEngine::start(&path, Duration::from_secs(30)).await.unwrap();
        let result = engine
            .evaluate("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 10)
            .await
            .unwrap();
        assert_eq!(result.best_move.as_deref(), Some("a1a8"));
        assert_eq!(result.score, Score::Mate(1));
        engine.stop().await;
    }
}
