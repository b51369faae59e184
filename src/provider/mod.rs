//! Player state collection.
//!
//! A [`PlayerStateProvider`] turns whatever the host engine exposes into an
//! ordered roster of [`PlayerRecord`]s. The variant is chosen when the adapter
//! is wired, never by inspecting the host at runtime:
//!
//! | Variant                  | Host model                          |
//! |--------------------------|-------------------------------------|
//! | [`DirectQueryProvider`]  | live world query (scripting engine) |
//! | [`EventTrackedProvider`] | push-based join/leave events        |
//! | [`StatusWatcher`]        | per-frame polled derived statuses   |
//!
//! Collection is synchronous and runs on the tick thread. A player that
//! cannot be read is skipped for that tick; only total host unavailability is
//! an error.

pub mod direct;
pub mod file;
pub mod tracked;
pub mod transition;

pub use direct::{DirectQueryProvider, WorldView};
pub use file::FileWorld;
pub use tracked::{EventTrackedProvider, PlayerDirectory};
pub use transition::{StatusWatcher, Transition, TransitionTracker};

use crate::error::{CollectError, UnreadablePlayer};
use crate::types::{Coordinates, DeafenRule, Dimension, Game, Orientation, PlayerRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait PlayerStateProvider: Send + Sync {
    /// Current roster, in a stable order.
    fn collect(&self) -> Result<Vec<PlayerRecord>, CollectError>;

    /// Platform tag stamped on every payload built from this provider.
    fn game(&self) -> Game;
}

// ---------------------------------------------------------------------------
// Host-side player view
// ---------------------------------------------------------------------------

/// Durable host identity of a player (UUID string on JVM hosts).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostPosition {
    pub coordinates: Coordinates,
    #[serde(default)]
    pub orientation: Orientation,
}

impl HostPosition {
    pub fn new(coordinates: Coordinates, orientation: Orientation) -> Self {
        Self {
            coordinates,
            orientation,
        }
    }
}

/// What the host reports about one player at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPlayer {
    pub name: String,
    /// `None` when the player has no valid world-space position (dead,
    /// mid-respawn).
    #[serde(default)]
    pub position: Option<HostPosition>,
    /// Raw host world identifier, e.g. `minecraft:the_nether`.
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub world_uuid: Option<String>,
    #[serde(default)]
    pub sneaking: bool,
    #[serde(default)]
    pub swimming: bool,
    #[serde(default)]
    pub spectator: bool,
    #[serde(default = "online_default")]
    pub online: bool,
}

fn online_default() -> bool {
    true
}

impl HostPlayer {
    pub fn new(name: impl Into<String>, position: HostPosition) -> Self {
        Self {
            name: name.into(),
            position: Some(position),
            world: None,
            world_uuid: None,
            sneaking: false,
            swimming: false,
            spectator: false,
            online: true,
        }
    }

    pub fn without_position(name: impl Into<String>) -> Self {
        Self {
            position: None,
            ..Self::new(name, HostPosition::new(Coordinates::origin(), Orientation::default()))
        }
    }

    pub fn in_world(mut self, world: impl Into<String>) -> Self {
        self.world = Some(world.into());
        self
    }

    pub fn with_world_uuid(mut self, world_uuid: impl Into<String>) -> Self {
        self.world_uuid = Some(world_uuid.into());
        self
    }

    pub fn sneaking(mut self, sneaking: bool) -> Self {
        self.sneaking = sneaking;
        self
    }

    pub fn swimming(mut self, swimming: bool) -> Self {
        self.swimming = swimming;
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }
}

/// Result of reading one player from the host.
pub type PlayerRead = Result<HostPlayer, UnreadablePlayer>;

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Convert a host view into the wire record for `game`.
pub fn normalize(game: Game, player: &HostPlayer, rule: DeafenRule) -> PlayerRecord {
    let Some(position) = player.position else {
        return PlayerRecord::dead(player.name.clone(), player.world_uuid.clone());
    };

    let dimension = player
        .world
        .as_deref()
        .map(|raw| Dimension::parse(game, raw))
        .unwrap_or_else(|| game.default_dimension());

    PlayerRecord {
        name: player.name.clone(),
        coordinates: position.coordinates,
        orientation: position.orientation,
        dimension: Some(dimension),
        world_uuid: player.world_uuid.clone(),
        deafen: rule.derive(player.sneaking, player.swimming),
        spectator: player.spectator,
    }
}

/// Normalise a batch of reads, skipping unreadable and disconnected players.
pub(crate) fn normalize_reads(
    game: Game,
    rule: DeafenRule,
    reads: impl IntoIterator<Item = PlayerRead>,
) -> Vec<PlayerRecord> {
    reads
        .into_iter()
        .filter_map(|read| match read {
            Ok(player) if player.online => Some(normalize(game, &player, rule)),
            Ok(player) => {
                debug!("Skipping disconnected player '{}'", player.name);
                None
            }
            Err(e) => {
                debug!("Skipping player this tick: {}", e);
                None
            }
        })
        .collect()
}
