//! Direct-query provider: reads the live world on every call.

use super::{normalize_reads, PlayerRead, PlayerStateProvider};
use crate::error::CollectError;
use crate::types::{DeafenRule, Game, PlayerRecord};
use std::sync::Arc;

/// Host world that can enumerate every connected player on demand.
pub trait WorldView: Send + Sync {
    /// All connected players, read at call time.
    fn players(&self) -> Result<Vec<PlayerRead>, CollectError>;
}

impl<W: WorldView + ?Sized> WorldView for Arc<W> {
    fn players(&self) -> Result<Vec<PlayerRead>, CollectError> {
        (**self).players()
    }
}

/// Stateless provider for hosts with a queryable world (scripting engines).
///
/// No caching: every [`collect`](PlayerStateProvider::collect) returns the
/// full roster as the host sees it right now.
pub struct DirectQueryProvider<W> {
    world: W,
    game: Game,
    deafen_rule: DeafenRule,
}

impl<W: WorldView> DirectQueryProvider<W> {
    pub fn new(world: W, game: Game) -> Self {
        Self {
            world,
            game,
            deafen_rule: DeafenRule::default(),
        }
    }

    pub fn with_deafen_rule(mut self, rule: DeafenRule) -> Self {
        self.deafen_rule = rule;
        self
    }

    pub fn world(&self) -> &W {
        &self.world
    }
}

impl<W: WorldView> PlayerStateProvider for DirectQueryProvider<W> {
    fn collect(&self) -> Result<Vec<PlayerRecord>, CollectError> {
        let reads = self.world.players()?;
        Ok(normalize_reads(self.game, self.deafen_rule, reads))
    }

    fn game(&self) -> Game {
        self.game
    }
}
