//! Tick-diff status tracking.
//!
//! Some statuses (crouch, spectator, death on ECS hosts) cannot be queried on
//! demand and are only visible by polling internal state every frame. The
//! tracker remembers the last value per identity and reports each change once.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// A change in a tracked boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub value: bool,
    /// First observation of this identity, already `true`.
    pub initial: bool,
}

pub struct TransitionTracker<K> {
    previous: Mutex<HashMap<K, bool>>,
}

impl<K: Eq + Hash + Clone> TransitionTracker<K> {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(HashMap::new()),
        }
    }

    /// Record `current` for `key` and return the transition, if any.
    ///
    /// A first observation of `true` yields a synthetic `initial` transition
    /// so late observers see steady-state conditions; a first `false` is
    /// silent.
    pub fn observe(&self, key: &K, current: bool) -> Option<Transition> {
        let previous = self.previous.lock().insert(key.clone(), current);
        match previous {
            None if current => Some(Transition {
                value: true,
                initial: true,
            }),
            None => None,
            Some(prev) if prev != current => Some(Transition {
                value: current,
                initial: false,
            }),
            Some(_) => None,
        }
    }

    /// Must be called when tracking for `key` is torn down.
    pub fn forget(&self, key: &K) -> bool {
        self.previous.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.previous.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.lock().is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for TransitionTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

type ChangeCallback<K> = Box<dyn Fn(&K, bool) + Send + Sync>;

/// A [`TransitionTracker`] bound to a change callback, one per status.
pub struct StatusWatcher<K> {
    label: &'static str,
    tracker: Arc<TransitionTracker<K>>,
    on_change: ChangeCallback<K>,
}

impl<K: Eq + Hash + Clone + Debug> StatusWatcher<K> {
    pub fn new(label: &'static str, on_change: impl Fn(&K, bool) + Send + Sync + 'static) -> Self {
        Self {
            label,
            tracker: Arc::new(TransitionTracker::new()),
            on_change: Box::new(on_change),
        }
    }

    /// Per-frame poll. Fires the callback at most once per transition.
    pub fn poll(&self, key: &K, current: bool) -> Option<Transition> {
        let transition = self.tracker.observe(key, current)?;
        debug!(
            "{:?} {} -> {}{}",
            key,
            self.label,
            transition.value,
            if transition.initial { " (initial)" } else { "" }
        );
        (self.on_change)(key, transition.value);
        Some(transition)
    }

    /// Call on disconnect so the tracker does not grow without bound.
    pub fn remove(&self, key: &K) {
        self.tracker.forget(key);
    }

    /// Shared view of the per-identity state, for owners that tear down
    /// identities on their own events.
    pub fn tracker(&self) -> Arc<TransitionTracker<K>> {
        Arc::clone(&self.tracker)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }
}
