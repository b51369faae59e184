//! File-backed world: a JSON roster that some other process keeps current.
//!
//! The file is re-read on every call, so it behaves like a live world query.
//! Expected shape is an array of [`HostPlayer`] objects:
//!
//! ```json
//! [
//!   {"name": "Alice",
//!    "position": {"coordinates": {"x": 1, "y": 64, "z": 2},
//!                 "orientation": {"x": 90, "y": 0}},
//!    "world": "minecraft:overworld", "sneaking": false},
//!   {"name": "Bob", "position": null}
//! ]
//! ```

use super::{HostPlayer, PlayerRead, WorldView};
use crate::error::{CollectError, UnreadablePlayer};
use std::path::{Path, PathBuf};

pub struct FileWorld {
    path: PathBuf,
}

impl FileWorld {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorldView for FileWorld {
    fn players(&self) -> Result<Vec<PlayerRead>, CollectError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            CollectError::HostUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).map_err(|e| {
            CollectError::HostUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        Ok(entries.into_iter().map(decode_entry).collect())
    }
}

fn decode_entry(value: serde_json::Value) -> PlayerRead {
    let name = value
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
        .to_string();
    serde_json::from_value::<HostPlayer>(value).map_err(|e| UnreadablePlayer::new(name, e.to_string()))
}
