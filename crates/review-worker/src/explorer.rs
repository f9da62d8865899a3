//! Lichess opening explorer client (masters database).

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::ReviewError;
use crate::opening_book::{normalize_san, TheoryDatabase, TheoryEntry};

pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.lichess.ovh/masters";

/// Wire format of an explorer response.
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    white: u64,
    #[serde(default)]
    draws: u64,
    #[serde(default)]
    black: u64,
    #[serde(default)]
    moves: Vec<ExplorerMove>,
}

#[derive(Debug, Deserialize)]
struct ExplorerMove {
    san: String,
    #[serde(default)]
    white: u64,
    #[serde(default)]
    draws: u64,
    #[serde(default)]
    black: u64,
}

impl ExplorerResponse {
    fn into_entry(self) -> TheoryEntry {
        TheoryEntry {
            total_games: self.white + self.draws + self.black,
            moves: self
                .moves
                .into_iter()
                .map(|m| (normalize_san(&m.san).to_string(), m.white + m.draws + m.black))
                .collect(),
        }
    }
}

pub struct ExplorerClient {
    client: Client,
    base_url: String,
}

impl ExplorerClient {
    pub fn new(base_url: &str) -> Result<Self, ReviewError> {
        let client = Client::builder()
            .user_agent("ChessReview/1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ReviewError::ExternalLookup(format!("Client build error: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    async fn fetch(&self, fen: &str) -> Result<TheoryEntry, ReviewError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("fen", fen), ("moves", "30"), ("topGames", "0")])
            .send()
            .await
            .map_err(|e| ReviewError::ExternalLookup(format!("Request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(ReviewError::ExternalLookup(format!("HTTP {}", resp.status())));
        }

        let body: ExplorerResponse = resp
            .json()
            .await
            .map_err(|e| ReviewError::ExternalLookup(format!("Body decode error: {e}")))?;

        Ok(body.into_entry())
    }
}

impl TheoryDatabase for ExplorerClient {
    fn lookup(&self, fen: &str) -> impl Future<Output = Result<TheoryEntry, ReviewError>> + Send {
        self.fetch(fen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_to_entry() {
        let json = r#"{
            "white": 10, "draws": 20, "black": 5,
            "moves": [
                {"uci": "e2e4", "san": "e4", "white": 6, "draws": 10, "black": 2},
                {"uci": "g1f3", "san": "Nf3+", "white": 4, "draws": 10, "black": 3}
            ],
            "topGames": []
        }"#;
        let resp: ExplorerResponse = serde_json::from_str(json).unwrap();
        let entry = resp.into_entry();
        assert_eq!(entry.total_games, 35);
        assert_eq!(entry.moves.get("e4"), Some(&18));
        assert_eq!(entry.moves.get("Nf3"), Some(&17));
    }

    #[test]
    fn test_empty_response() {
        let resp: ExplorerResponse = serde_json::from_str("{}").unwrap();
        let entry = resp.into_entry();
        assert_eq!(entry.total_games, 0);
        assert!(entry.moves.is_empty());
    }
}
