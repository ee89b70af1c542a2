//! Per-channel observer sets and the mutations applied to them.

use rustc_hash::FxHashMap;

use crate::events::Channel;
use crate::observers::Observer;

/// A deferred change to the observer sets.
///
/// The channel travels inside the [`Observer`] variant.
#[derive(Debug, Clone)]
pub enum Mutation {
    Add(Observer),
    Remove(Observer),
}

impl Mutation {
    pub fn channel(&self) -> Channel {
        match self {
            Mutation::Add(observer) | Mutation::Remove(observer) => observer.channel(),
        }
    }
}

/// Currently registered observers, one insertion-ordered set per channel.
///
/// Membership is by identity ([`Observer::same`]); adding an observer that is
/// already present leaves the set untouched.
#[derive(Debug, Default)]
pub struct ObserverSets {
    sets: FxHashMap<Channel, Vec<Observer>>,
}

impl ObserverSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one mutation. Returns whether the set changed.
    ///
    /// Every observer handle the sets let go of (a removed member, the
    /// handle carried by a removal, a duplicate addition) is pushed onto
    /// `released` instead of being dropped here. Dropping one may run
    /// observer code, so callers drop them once the engine lock is free.
    pub fn apply(&mut self, mutation: Mutation, released: &mut Vec<Observer>) -> bool {
        match mutation {
            Mutation::Add(observer) => {
                let set = self.sets.entry(observer.channel()).or_default();
                if set.iter().any(|o| o.same(&observer)) {
                    released.push(observer);
                    return false;
                }
                set.push(observer);
                true
            }
            Mutation::Remove(observer) => {
                let mut changed = false;
                if let Some(set) = self.sets.get_mut(&observer.channel())
                    && let Some(at) = set.iter().position(|o| o.same(&observer))
                {
                    released.push(set.remove(at));
                    changed = true;
                }
                released.push(observer);
                changed
            }
        }
    }

    /// Copy of the channel's members, in insertion order.
    pub fn snapshot(&self, channel: Channel) -> Vec<Observer> {
        self.sets.get(&channel).cloned().unwrap_or_default()
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.sets.get(&channel).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, channel: Channel) -> bool {
        self.len(channel) == 0
    }

    pub fn contains(&self, observer: &Observer) -> bool {
        self.sets
            .get(&observer.channel())
            .is_some_and(|set| set.iter().any(|o| o.same(observer)))
    }
}
