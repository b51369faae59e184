//! Core telemetry types shared across all modules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

/// World-space position of a player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    #[serde(serialize_with = "compact_f64")]
    pub x: f64,
    #[serde(serialize_with = "compact_f64")]
    pub y: f64,
    #[serde(serialize_with = "compact_f64")]
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Head orientation. `x` carries yaw and `y` carries pitch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Orientation {
    #[serde(serialize_with = "compact_f32")]
    pub x: f32,
    #[serde(serialize_with = "compact_f32")]
    pub y: f32,
}

impl Orientation {
    pub fn from_yaw_pitch(yaw: f32, pitch: f32) -> Self {
        Self { x: yaw, y: pitch }
    }

    pub fn yaw(&self) -> f32 {
        self.x
    }

    pub fn pitch(&self) -> f32 {
        self.y
    }
}

// Integral values go out as JSON integers (`64`, not `64.0`) so every adapter
// produces the same bytes for the same position.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn compact_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn compact_f32<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && (*value as f64).abs() < MAX_EXACT_INT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f32(*value)
    }
}

// ---------------------------------------------------------------------------
// Game / dimension
// ---------------------------------------------------------------------------

/// Source platform of a payload.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    #[default]
    Minecraft,
    Hytale,
}

impl Game {
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Minecraft => "minecraft",
            Game::Hytale => "hytale",
        }
    }

    /// Dimension reported when the host gives no world for a live player.
    pub fn default_dimension(&self) -> Dimension {
        match self {
            Game::Minecraft => Dimension::Minecraft(MinecraftDimension::Overworld),
            Game::Hytale => Dimension::Hytale(HytaleDimension::Orbis),
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum MinecraftDimension {
    Overworld,
    Nether,
    TheEnd,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum HytaleDimension {
    Orbis,
}

/// Which world or layer a player occupies.
///
/// `Death` is a pseudo-dimension for players with no valid world-space
/// position (mid-respawn); they are reported at the origin instead of being
/// dropped. `Custom` keeps unrecognised identifiers verbatim.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum Dimension {
    Minecraft(MinecraftDimension),
    Hytale(HytaleDimension),
    Death,
    Custom(String),
}

impl Dimension {
    /// Map a host world identifier onto a dimension for `game`.
    pub fn parse(game: Game, raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        if lowered == "death" {
            return Dimension::Death;
        }

        let known = match game {
            Game::Minecraft => match lowered.as_str() {
                "minecraft:overworld" | "overworld" | "world" => {
                    Some(Dimension::Minecraft(MinecraftDimension::Overworld))
                }
                "minecraft:the_nether" | "the_nether" | "nether" | "world_nether" => {
                    Some(Dimension::Minecraft(MinecraftDimension::Nether))
                }
                "minecraft:the_end" | "the_end" | "world_the_end" => {
                    Some(Dimension::Minecraft(MinecraftDimension::TheEnd))
                }
                _ => None,
            },
            Game::Hytale => match lowered.as_str() {
                "orbis" => Some(Dimension::Hytale(HytaleDimension::Orbis)),
                _ => None,
            },
        };

        known.unwrap_or_else(|| Dimension::Custom(raw.to_string()))
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Dimension::Minecraft(MinecraftDimension::Overworld) => "overworld",
            Dimension::Minecraft(MinecraftDimension::Nether) => "nether",
            Dimension::Minecraft(MinecraftDimension::TheEnd) => "the_end",
            Dimension::Hytale(HytaleDimension::Orbis) => "orbis",
            Dimension::Death => "death",
            Dimension::Custom(name) => name,
        }
    }

    pub fn is_death(&self) -> bool {
        matches!(self, Dimension::Death)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // The wire carries no game context; canonical names are unique across games.
        let parsed = match Dimension::parse(Game::Minecraft, &raw) {
            Dimension::Custom(_) => Dimension::parse(Game::Hytale, &raw),
            known => known,
        };
        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Player record
// ---------------------------------------------------------------------------

/// Normalised state of one player, built fresh each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub name: String,
    pub coordinates: Coordinates,
    pub orientation: Orientation,
    pub dimension: Option<Dimension>,
    /// Only set on platforms that run several world instances at once.
    pub world_uuid: Option<String>,
    pub deafen: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub spectator: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PlayerRecord {
    pub fn new(
        name: impl Into<String>,
        coordinates: Coordinates,
        orientation: Orientation,
        dimension: Option<Dimension>,
        deafen: bool,
    ) -> Self {
        Self {
            name: name.into(),
            coordinates,
            orientation,
            dimension,
            world_uuid: None,
            deafen,
            spectator: false,
        }
    }

    /// A player with no world-space position: origin, zero orientation,
    /// `death` dimension, never deafened.
    pub fn dead(name: impl Into<String>, world_uuid: Option<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: Coordinates::origin(),
            orientation: Orientation::default(),
            dimension: Some(Dimension::Death),
            world_uuid,
            deafen: false,
            spectator: false,
        }
    }

    pub fn with_world_uuid(mut self, world_uuid: impl Into<String>) -> Self {
        self.world_uuid = Some(world_uuid.into());
        self
    }

    pub fn with_spectator(mut self, spectator: bool) -> Self {
        self.spectator = spectator;
        self
    }

    pub fn is_dead(&self) -> bool {
        self.dimension.as_ref().is_some_and(Dimension::is_death)
    }
}

// ---------------------------------------------------------------------------
// Deafen policy
// ---------------------------------------------------------------------------

/// How an adapter derives the `deafen` flag from host movement state.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeafenRule {
    #[default]
    Sneaking,
    SneakingOrSwimming,
}

impl DeafenRule {
    pub fn derive(&self, sneaking: bool, swimming: bool) -> bool {
        match self {
            DeafenRule::Sneaking => sneaking,
            DeafenRule::SneakingOrSwimming => sneaking || swimming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_maps_minecraft_aliases() {
        let nether = Dimension::Minecraft(MinecraftDimension::Nether);
        for raw in ["minecraft:the_nether", "NETHER", "world_nether"] {
            assert_eq!(Dimension::parse(Game::Minecraft, raw), nether);
        }
        assert_eq!(
            Dimension::parse(Game::Minecraft, "world"),
            Dimension::Minecraft(MinecraftDimension::Overworld)
        );
    }

    #[test]
    fn parse_keeps_unknown_names_verbatim() {
        assert_eq!(
            Dimension::parse(Game::Minecraft, "Skyblock_Islands"),
            Dimension::Custom("Skyblock_Islands".into())
        );
        // Hytale does not know Minecraft names.
        assert_eq!(
            Dimension::parse(Game::Hytale, "nether"),
            Dimension::Custom("nether".into())
        );
    }

    #[test]
    fn death_is_recognised_for_every_game() {
        assert!(Dimension::parse(Game::Minecraft, "death").is_death());
        assert!(Dimension::parse(Game::Hytale, "DEATH").is_death());
    }

    #[test]
    fn integral_floats_serialise_as_integers() {
        let json = serde_json::to_string(&Coordinates::new(1.0, 64.0, -2.0)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":64,"z":-2}"#);

        let json = serde_json::to_string(&Coordinates::new(1.5, 64.0, 0.25)).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":64,"z":0.25}"#);
    }

    #[test]
    fn deafen_rule_variants() {
        assert!(!DeafenRule::Sneaking.derive(false, true));
        assert!(DeafenRule::SneakingOrSwimming.derive(false, true));
        assert!(DeafenRule::Sneaking.derive(true, false));
    }
}
