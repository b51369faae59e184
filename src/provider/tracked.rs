//! Event-tracked provider for hosts with push-based join/leave events.
//!
//! Membership and status caches are written from the host's event thread
//! and read from the tick thread, so every set sits behind a
//! `parking_lot::RwLock`. Locks are never held while calling into the host.

use super::{normalize, PlayerId, PlayerStateProvider, StatusWatcher, TransitionTracker};
use crate::error::CollectError;
use crate::types::{DeafenRule, Game, PlayerRecord};
use log::debug;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

/// Resolves a tracked id to the host's current view of that player.
pub trait PlayerDirectory: Send + Sync {
    /// `Ok(None)` when the host no longer knows the id (stale membership).
    fn lookup(&self, id: &PlayerId) -> Result<Option<super::PlayerRead>, CollectError>;
}

impl<D: PlayerDirectory + ?Sized> PlayerDirectory for Arc<D> {
    fn lookup(&self, id: &PlayerId) -> Result<Option<super::PlayerRead>, CollectError> {
        (**self).lookup(id)
    }
}

#[derive(Default)]
struct Membership {
    next_seq: u64,
    joined: HashMap<PlayerId, u64>,
}

pub struct EventTrackedProvider<D> {
    directory: D,
    game: Game,
    deafen_rule: DeafenRule,
    members: RwLock<Membership>,
    dead: RwLock<HashSet<PlayerId>>,
    crouching: RwLock<HashSet<PlayerId>>,
    spectators: RwLock<HashSet<PlayerId>>,
    /// Trackers of watchers handed out by this provider.
    watchers: RwLock<Vec<Weak<TransitionTracker<PlayerId>>>>,
}

impl<D: PlayerDirectory> EventTrackedProvider<D> {
    pub fn new(directory: D, game: Game) -> Self {
        Self {
            directory,
            game,
            deafen_rule: DeafenRule::default(),
            members: RwLock::new(Membership::default()),
            dead: RwLock::new(HashSet::new()),
            crouching: RwLock::new(HashSet::new()),
            spectators: RwLock::new(HashSet::new()),
            watchers: RwLock::new(Vec::new()),
        }
    }

    pub fn with_deafen_rule(mut self, rule: DeafenRule) -> Self {
        self.deafen_rule = rule;
        self
    }

    // -----------------------------------------------------------------------
    // Membership (join / leave events)
    // -----------------------------------------------------------------------

    /// Idempotent: a repeated join keeps the original position in the roster.
    pub fn add_player(&self, id: PlayerId) {
        let mut members = self.members.write();
        if members.joined.contains_key(&id) {
            return;
        }
        let seq = members.next_seq;
        members.next_seq += 1;
        members.joined.insert(id, seq);
    }

    /// Drops the player, every cached status for it and its last observed
    /// value in each live watcher, so a rejoin is seen as a first observation.
    pub fn remove_player(&self, id: &PlayerId) {
        self.members.write().joined.remove(id);
        self.dead.write().remove(id);
        self.crouching.write().remove(id);
        self.spectators.write().remove(id);

        let mut watchers = self.watchers.write();
        watchers.retain(|tracker| match tracker.upgrade() {
            Some(tracker) => {
                tracker.forget(id);
                true
            }
            None => false,
        });
    }

    pub fn is_tracked(&self, id: &PlayerId) -> bool {
        self.members.read().joined.contains_key(id)
    }

    pub fn tracked_count(&self) -> usize {
        self.members.read().joined.len()
    }

    // -----------------------------------------------------------------------
    // Status caches (death / crouch / spectator systems)
    // -----------------------------------------------------------------------

    pub fn mark_dead(&self, id: PlayerId) {
        self.dead.write().insert(id);
    }

    pub fn mark_alive(&self, id: &PlayerId) {
        self.dead.write().remove(id);
    }

    pub fn set_crouching(&self, id: &PlayerId, crouching: bool) {
        toggle(&self.crouching, id, crouching);
    }

    pub fn set_spectator(&self, id: &PlayerId, spectator: bool) {
        toggle(&self.spectators, id, spectator);
    }

    fn members_in_join_order(&self) -> Vec<PlayerId> {
        let members = self.members.read();
        let mut ids: Vec<_> = members
            .joined
            .iter()
            .map(|(id, seq)| (*seq, id.clone()))
            .collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

impl<D: PlayerDirectory + 'static> EventTrackedProvider<D> {
    /// Tick-diff watcher that feeds crouch transitions into this provider.
    /// [`remove_player`](Self::remove_player) also resets its state.
    pub fn crouch_watcher(self: &Arc<Self>) -> StatusWatcher<PlayerId> {
        let provider = Arc::clone(self);
        self.register(StatusWatcher::new("crouching", move |id: &PlayerId, value| {
            provider.set_crouching(id, value)
        }))
    }

    /// Tick-diff watcher that feeds spectator transitions into this provider.
    pub fn spectator_watcher(self: &Arc<Self>) -> StatusWatcher<PlayerId> {
        let provider = Arc::clone(self);
        self.register(StatusWatcher::new("spectator", move |id: &PlayerId, value| {
            provider.set_spectator(id, value)
        }))
    }

    fn register(&self, watcher: StatusWatcher<PlayerId>) -> StatusWatcher<PlayerId> {
        self.watchers.write().push(Arc::downgrade(&watcher.tracker()));
        watcher
    }
}

fn toggle(set: &RwLock<HashSet<PlayerId>>, id: &PlayerId, on: bool) {
    if on {
        set.write().insert(id.clone());
    } else {
        set.write().remove(id);
    }
}

impl<D: PlayerDirectory> PlayerStateProvider for EventTrackedProvider<D> {
    fn collect(&self) -> Result<Vec<PlayerRecord>, CollectError> {
        let ids = self.members_in_join_order();
        let mut records = Vec::with_capacity(ids.len());

        for id in ids {
            // Join/leave events and the real connection state can diverge
            // briefly; only the live lookup decides who is reported.
            let player = match self.directory.lookup(&id)? {
                Some(Ok(player)) if player.online => player,
                Some(Ok(player)) => {
                    debug!("Tracked player '{}' is no longer online", player.name);
                    continue;
                }
                Some(Err(e)) => {
                    debug!("Skipping player this tick: {}", e);
                    continue;
                }
                None => {
                    debug!("Tracked player {} has no live host reference", id);
                    continue;
                }
            };

            if self.dead.read().contains(&id) {
                records.push(PlayerRecord::dead(player.name, player.world_uuid));
                continue;
            }

            let mut record = normalize(self.game, &player, self.deafen_rule);
            record.deafen |= self.crouching.read().contains(&id);
            record.spectator |= self.spectators.read().contains(&id);
            records.push(record);
        }

        Ok(records)
    }

    fn game(&self) -> Game {
        self.game
    }
}
