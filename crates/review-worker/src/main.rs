//! Game review worker
//!
//! Queues the given games, reviews them one at a time against a local
//! Stockfish, and prints a line per game.

use anyhow::Context;
use chess_core::GameRecord;
use tracing::{info, warn};

use review_worker::book_cache::LocalBook;
use review_worker::config::WorkerConfig;
use review_worker::db::PgStore;
use review_worker::explorer::ExplorerClient;
use review_worker::opening_book::{OpeningBook, TheorySource};
use review_worker::stockfish::StockfishEngine;
use review_worker::{
    Classification, DepthPreset, GameAnalyzer, GameStore, JobStatus, MemoryStore, Scheduler,
};

const USAGE: &str =
    "usage: review-worker [--games 12,34] [--pgn a.pgn,b.pgn] [--preset fast|balanced|thorough]";

#[derive(Debug, Default)]
struct CliArgs {
    games: Vec<i64>,
    pgn_files: Vec<String>,
    preset: DepthPreset,
}

/// Parse --games, --pgn and --preset from CLI args
fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).map(String::as_str);
        match (args[i].as_str(), value) {
            ("--games", Some(ids)) => {
                cli.games = ids
                    .split(',')
                    .map(|s| {
                        s.trim()
                            .parse()
                            .with_context(|| format!("invalid game id {s:?}\n{USAGE}"))
                    })
                    .collect::<anyhow::Result<_>>()?;
            }
            ("--pgn", Some(files)) => {
                cli.pgn_files = files.split(',').map(|s| s.trim().to_string()).collect();
            }
            ("--preset", Some(name)) => cli.preset = name.parse()?,
            (flag, _) => anyhow::bail!("unexpected argument {flag}\n{USAGE}"),
        }
        i += 2;
    }
    Ok(cli)
}

/// PGN files are loaded into the in-memory store, which is only used
/// without a database.
fn check_backend(cli: &CliArgs, database_url: Option<&str>) -> anyhow::Result<()> {
    if database_url.is_some() && !cli.pgn_files.is_empty() {
        anyhow::bail!("--pgn cannot be combined with DATABASE_URL\n{USAGE}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;
    if cli.games.is_empty() && cli.pgn_files.is_empty() {
        println!("{USAGE}");
        return Ok(());
    }

    let config = WorkerConfig::load()?;
    check_backend(&cli, config.database_url.as_deref())?;
    info!(
        stockfish_path = %config.stockfish_path,
        preset = cli.preset.as_str(),
        depth = cli.preset.depth(),
        "Worker config loaded"
    );

    let engine = StockfishEngine::start(&config.stockfish_path, config.engine_timeout).await?;

    let theory = match &config.book_file {
        Some(path) => {
            let local =
                LocalBook::load(path).with_context(|| format!("loading opening book {path}"))?;
            if local.is_empty() {
                warn!(path = %path, "Opening book is empty, no move will count as book");
            }
            TheorySource::Local(local)
        }
        None => TheorySource::Explorer(ExplorerClient::new(&config.explorer_url)?),
    };
    let book = OpeningBook::with_throttle(theory, config.book_throttle);

    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            review_games(engine, book, store, &config, cli.games, cli.preset).await
        }
        None => {
            let store = MemoryStore::new();
            let mut games = cli.games;
            for (n, path) in cli.pgn_files.iter().enumerate() {
                let pgn = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {path}"))?;
                let id = n as i64 + 1;
                store.insert_game(GameRecord::from_pgn(id, &pgn));
                if !games.contains(&id) {
                    games.push(id);
                }
            }
            info!(games = games.len(), "No DATABASE_URL, using in-memory store");
            review_games(engine, book, store, &config, games, cli.preset).await
        }
    }
}

async fn review_games<S: GameStore + 'static>(
    engine: StockfishEngine,
    book: OpeningBook<TheorySource>,
    store: S,
    config: &WorkerConfig,
    games: Vec<i64>,
    preset: DepthPreset,
) -> anyhow::Result<()> {
    let analyzer = GameAnalyzer::new(engine, book, store).with_miss_policy(config.miss_policy);
    let scheduler = Scheduler::new(analyzer);

    for game_id in &games {
        scheduler.submit(*game_id, preset);
    }

    let mut failed = 0u32;
    for game_id in &games {
        let Some(job) = scheduler.wait_for(*game_id).await else {
            continue;
        };
        match job.status {
            JobStatus::Completed => {
                let review = scheduler.runner().store().find_review(*game_id).await?;
                match review {
                    Some(stored) => {
                        let r = &stored.review;
                        let counts: Vec<String> = Classification::ALL
                            .iter()
                            .filter_map(|&c| {
                                let n = r.combined.totals.counts.get(c);
                                (n > 0).then(|| format!("{c}={n}"))
                            })
                            .collect();
                        println!(
                            "game {game_id}: completed (review {}) white {:.1}% black {:.1}% critical {} [{}]",
                            stored.id,
                            r.white.accuracy,
                            r.black.accuracy,
                            r.combined.critical_moments,
                            counts.join(" ")
                        );
                    }
                    None => println!("game {game_id}: completed"),
                }
            }
            _ => {
                failed += 1;
                let retry = if job.retryable == Some(true) { "retryable" } else { "permanent" };
                println!(
                    "game {game_id}: failed ({retry}): {}",
                    job.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    scheduler.runner().evaluator().lock().await.stop().await;
    println!("{} reviewed, {failed} failed", games.len() as u32 - failed);
    Ok(())
}
