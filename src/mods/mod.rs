//! Client mods: toggleable features built on top of the event bus.
//!
//! A mod exposes the observers it needs; [`ModManager`] subscribes them when
//! the mod is enabled and unsubscribes them when it is disabled. Game access
//! goes through the [`Combat`] collaborator so mods stay independent of the
//! client they run in.
//!
//! - [`autoattack`] – attacks the closest entity in range on every tick
//! - [`criticals`] – turns hits into critical hits
pub mod autoattack;
pub mod criticals;

use std::sync::Arc;

use log::{info, warn};

use crate::dispatch::EventManager;
use crate::events::input::EntityId;
use crate::observers::Observer;

/// An attackable entity and how far away it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub entity: EntityId,
    pub distance: f32,
}

/// The slice of the game client the combat mods drive.
pub trait Combat: Send + Sync {
    /// Closest living entity that may be attacked.
    fn closest_target(&self) -> Option<Target>;
    /// Swing at and attack `entity`.
    fn attack(&self, entity: EntityId);
    /// Whether the player could land a critical hit right now (on the ground,
    /// not in water or lava).
    fn can_crit(&self) -> bool;
    /// Send the small hop that makes the next hit critical.
    fn crit_hop(&self);
}

pub trait Mod: Send + Sync {
    fn name(&self) -> &'static str;

    /// Observers to subscribe while the mod is enabled. Must return the same
    /// objects on every call so they can be unsubscribed again.
    fn observers(self: Arc<Self>) -> Vec<Observer>;

    fn on_enable(&self) {}

    fn on_disable(&self) {}
}

struct ModEntry {
    module: Arc<dyn Mod>,
    enabled: bool,
}

/// Registry of mods and their enabled state.
pub struct ModManager {
    events: EventManager,
    mods: Vec<ModEntry>,
}

impl ModManager {
    pub fn new(events: EventManager) -> Self {
        Self {
            events,
            mods: Vec::new(),
        }
    }

    /// Adds a disabled mod. A second mod with the same name is ignored.
    pub fn register(&mut self, module: Arc<dyn Mod>) {
        if self.mods.iter().any(|e| e.module.name() == module.name()) {
            warn!("mod {} already registered", module.name());
            return;
        }
        self.mods.push(ModEntry {
            module,
            enabled: false,
        });
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mods.iter().map(|e| e.module.name())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.mods
            .iter()
            .any(|e| e.enabled && e.module.name() == name)
    }

    /// Enables or disables a mod. Returns `false` if no such mod exists.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let Some(entry) = self.mods.iter_mut().find(|e| e.module.name() == name) else {
            return false;
        };
        if entry.enabled == enabled {
            return true;
        }
        entry.enabled = enabled;
        let observers = Arc::clone(&entry.module).observers();
        if enabled {
            entry.module.on_enable();
            for observer in observers {
                self.events.subscribe(observer);
            }
        } else {
            for observer in &observers {
                self.events.unsubscribe(observer);
            }
            entry.module.on_disable();
        }
        info!("{} {}", name, if enabled { "enabled" } else { "disabled" });
        true
    }

    /// Flips a mod. Returns the new state, or `None` if no such mod exists.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let enabled = !self.is_enabled(name);
        self.set_enabled(name, enabled).then_some(enabled)
    }
}
