//! Worker configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ReviewError;
use crate::explorer::DEFAULT_EXPLORER_URL;
use crate::thresholds::MissPolicy;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Postgres URL; without one the worker keeps games in memory
    pub database_url: Option<String>,

    /// Local bincode opening book, used instead of the explorer when set
    pub book_file: Option<String>,

    pub explorer_url: String,

    /// Minimum gap between explorer requests
    pub book_throttle: Duration,

    /// Upper bound on a single engine evaluation
    pub engine_timeout: Duration,

    pub miss_policy: MissPolicy,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ReviewError> {
        let stockfish_path = env::var("STOCKFISH_PATH")
            .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let book_file = env::var("BOOK_FILE").ok().filter(|v| !v.is_empty());
        let explorer_url =
            env::var("BOOK_EXPLORER_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_URL.to_string());

        let book_throttle = Duration::from_millis(parse_var(
            "BOOK_THROTTLE_MS",
            70,
            "BOOK_THROTTLE_MS must be a whole number of milliseconds",
        )?);
        let engine_timeout = Duration::from_secs(parse_var(
            "ENGINE_TIMEOUT_SECS",
            120,
            "ENGINE_TIMEOUT_SECS must be a whole number of seconds",
        )?);

        let defaults = MissPolicy::default();
        let miss_policy = MissPolicy {
            best_min_cp: parse_var(
                "MISS_BEST_CP",
                defaults.best_min_cp,
                "MISS_BEST_CP must be an integer",
            )?,
            equal_band_cp: parse_var(
                "MISS_EQUAL_CP",
                defaults.equal_band_cp,
                "MISS_EQUAL_CP must be an integer",
            )?,
            max_epl: parse_var("MISS_MAX_EPL", defaults.max_epl, "MISS_MAX_EPL must be a number")?,
        };
        if !(0.0..=1.0).contains(&miss_policy.max_epl) {
            return Err(ReviewError::Config("MISS_MAX_EPL must be between 0 and 1"));
        }

        Ok(Self {
            stockfish_path,
            database_url,
            book_file,
            explorer_url,
            book_throttle,
            engine_timeout,
            miss_policy,
        })
    }
}

/// Read `name`, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &str, default: T, invalid: &'static str) -> Result<T, ReviewError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ReviewError::Config(invalid))
        }
        _ => Ok(default),
    }
}
