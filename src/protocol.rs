//! Position wire protocol (adapter → BVC server).
//!
//! This module owns **every message that crosses the HTTP/FFI boundary**
//! between an adapter and the voice server.
//!
//! ## Request shape
//!
//! | Item      | Value                                         |
//! |-----------|-----------------------------------------------|
//! | Method    | `POST`                                        |
//! | Path      | `{server}/api/position`                       |
//! | Headers   | `Content-Type`, `X-MC-Access-Token`, `Accept` |
//! | Body      | [`Payload`] as JSON                           |
//!
//! ## Design rules
//!
//! 1. Field names are fixed snake_case strings.
//! 2. `dimension` and `world_uuid` are written as `null`, never omitted.
//! 3. Player order is the order the provider produced, no implicit sort.
//! 4. A payload is a full-state snapshot; the server never needs the previous one.

use crate::types::{Game, PlayerRecord};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

pub const POSITION_PATH: &str = "/api/position";
pub const ACCESS_TOKEN_HEADER: &str = "X-MC-Access-Token";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Full URL of the position endpoint for a configured server base URL.
pub fn position_url(server: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), POSITION_PATH)
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Platform-tagged envelope of one tick's roster.
///
/// Built once per tick, handed to a sink and dropped after the attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    pub game: Game,
    pub players: Vec<PlayerRecord>,
}

impl Payload {
    /// Wrap `records` for `game`. Pure and total: an empty roster is valid.
    pub fn build(game: Game, records: Vec<PlayerRecord>) -> Self {
        Self {
            game,
            players: records,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
