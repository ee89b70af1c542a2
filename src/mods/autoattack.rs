//! Auto-attack: hits the closest entity in range, rate-limited by the
//! configured attack speed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::trace;

use crate::config::AutoAttackSettings;
use crate::mods::criticals::Criticals;
use crate::mods::{Combat, Mod};
use crate::observers::{Observer, TickObserver};

pub struct AutoAttack {
    settings: AutoAttackSettings,
    combat: Arc<dyn Combat>,
    criticals: Option<Arc<Criticals>>,
    last_attack: Mutex<Option<Instant>>,
    attacks: AtomicU64,
}

impl AutoAttack {
    pub fn new(settings: AutoAttackSettings, combat: Arc<dyn Combat>) -> Self {
        Self {
            settings,
            combat,
            criticals: None,
            last_attack: Mutex::new(None),
            attacks: AtomicU64::new(0),
        }
    }

    /// Land critical hits through `criticals` whenever that mod is on.
    pub fn with_criticals(mut self, criticals: Arc<Criticals>) -> Self {
        self.criticals = Some(criticals);
        self
    }

    /// Minimum time between two attacks. `None` when the configured speed
    /// is unusable; the mod then never attacks.
    pub fn interval(&self) -> Option<Duration> {
        self.settings.interval()
    }

    /// Attacks performed so far.
    pub fn attacks(&self) -> u64 {
        self.attacks.load(Ordering::Relaxed)
    }
}

impl TickObserver for AutoAttack {
    fn on_tick(&self) {
        let Some(interval) = self.interval() else {
            return;
        };
        let mut last = self
            .last_attack
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(at) = *last
            && at.elapsed() < interval
        {
            return;
        }
        let Some(target) = self.combat.closest_target() else {
            return;
        };
        if target.distance > self.settings.effective_range() {
            return;
        }

        if let Some(criticals) = &self.criticals {
            criticals.do_critical();
        }
        trace!("attacking {} at {:.2}", target.entity, target.distance);
        self.combat.attack(target.entity);
        *last = Some(Instant::now());
        self.attacks.fetch_add(1, Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "AutoAttack"
    }
}

impl Mod for AutoAttack {
    fn name(&self) -> &'static str {
        "AutoAttack"
    }

    fn observers(self: Arc<Self>) -> Vec<Observer> {
        vec![Observer::tick(self)]
    }
}
