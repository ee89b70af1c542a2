//! Criticals: hop before every hit so it lands as a critical hit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::input::LeftClickEvent;
use crate::mods::{Combat, Mod};
use crate::observers::{LeftClickObserver, Observer};

pub struct Criticals {
    combat: Arc<dyn Combat>,
    active: AtomicBool,
}

impl Criticals {
    pub fn new(combat: Arc<dyn Combat>) -> Self {
        Self {
            combat,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Hops if the mod is on and the player can crit. Other mods call this
    /// right before they attack.
    pub fn do_critical(&self) {
        if self.is_active() && self.combat.can_crit() {
            self.combat.crit_hop();
        }
    }
}

impl LeftClickObserver for Criticals {
    fn on_left_click(&self, event: &LeftClickEvent) {
        if event.target.is_some() {
            self.do_critical();
        }
    }

    fn name(&self) -> &'static str {
        "Criticals"
    }
}

impl Mod for Criticals {
    fn name(&self) -> &'static str {
        "Criticals"
    }

    fn observers(self: Arc<Self>) -> Vec<Observer> {
        vec![Observer::left_click(self)]
    }

    fn on_enable(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    fn on_disable(&self) {
        self.active.store(false, Ordering::Relaxed);
    }
}
