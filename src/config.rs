//! Client configuration.
//!
//! Settings are loaded from an INI file. Defaults are safe to start with, and
//! any key missing from the file keeps its default.
//!
//! # Configuration File Format
//!
//! ```ini
//! [bus]
//! backlog_warn = 64
//!
//! [client]
//! ticks = 200
//! tick_ms = 50
//! network_threads = 2
//! inject_faults = false
//!
//! [autoattack]
//! speed = 20.0
//! range = 5.0
//! strict = false
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_BACKLOG_WARN: usize = 64;
const DEFAULT_TICKS: u64 = 200;
const DEFAULT_TICK_MS: u64 = 50;
const DEFAULT_NETWORK_THREADS: usize = 2;
const DEFAULT_INJECT_FAULTS: bool = false;
const DEFAULT_ATTACK_SPEED: f32 = 20.0;
const DEFAULT_ATTACK_RANGE: f32 = 5.0;
const DEFAULT_STRICT: bool = false;
const DEFAULT_CONFIG_PATH: &str = "./hookbus.ini";

/// Strict-mode limits, low enough to pass server-side anticheat checks.
pub const STRICT_ATTACK_SPEED: f32 = 12.0;
pub const STRICT_ATTACK_RANGE: f32 = 4.25;

/// Event manager settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    /// Backlog depth at which a warning is logged. `0` disables the warning.
    /// The backlog itself is unbounded.
    pub backlog_warn: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backlog_warn: DEFAULT_BACKLOG_WARN,
        }
    }
}

/// Settings of the headless client loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Simulation ticks to run before exiting.
    pub ticks: u64,
    /// Milliseconds between ticks.
    pub tick_ms: u64,
    /// Threads feeding packets and chat into the bus.
    pub network_threads: usize,
    /// Register observers that panic, to exercise fault reporting.
    pub inject_faults: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            ticks: DEFAULT_TICKS,
            tick_ms: DEFAULT_TICK_MS,
            network_threads: DEFAULT_NETWORK_THREADS,
            inject_faults: DEFAULT_INJECT_FAULTS,
        }
    }
}

/// Auto-attack mod settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoAttackSettings {
    /// Attacks per second.
    pub speed: f32,
    /// Maximum reach in blocks.
    pub range: f32,
    /// Clamp speed and range to [`STRICT_ATTACK_SPEED`] / [`STRICT_ATTACK_RANGE`].
    pub strict: bool,
}

impl Default for AutoAttackSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_ATTACK_SPEED,
            range: DEFAULT_ATTACK_RANGE,
            strict: DEFAULT_STRICT,
        }
    }
}

impl AutoAttackSettings {
    /// Speed actually used, after the strict-mode clamp.
    pub fn effective_speed(&self) -> f32 {
        if self.strict {
            self.speed.min(STRICT_ATTACK_SPEED)
        } else {
            self.speed
        }
    }

    /// Range actually used, after the strict-mode clamp.
    pub fn effective_range(&self) -> f32 {
        if self.strict {
            self.range.min(STRICT_ATTACK_RANGE)
        } else {
            self.range
        }
    }

    /// Minimum time between two attacks, or `None` when the speed is not a
    /// positive finite number or is too slow for a [`Duration`].
    pub fn interval(&self) -> Option<Duration> {
        attack_interval(self.effective_speed())
    }
}

fn attack_interval(speed: f32) -> Option<Duration> {
    if !(speed.is_finite() && speed > 0.0) {
        return None;
    }
    Duration::try_from_secs_f32(1.0 / speed).ok()
}

/// Whole-client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub bus: BusConfig,
    pub client: ClientSettings,
    pub autoattack: AutoAttackSettings,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(section: &'static str, key: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        section,
        key,
        reason,
    }
}

fn get_uint(ini: &Ini, section: &'static str, key: &'static str) -> Result<Option<u64>, ConfigError> {
    ini.getuint(section, key)
        .map_err(|e| invalid(section, key, e))
}

fn get_bool(ini: &Ini, section: &'static str, key: &'static str) -> Result<Option<bool>, ConfigError> {
    ini.getbool(section, key)
        .map_err(|e| invalid(section, key, e))
}

fn get_float(ini: &Ini, section: &'static str, key: &'static str) -> Result<Option<f64>, ConfigError> {
    ini.getfloat(section, key)
        .map_err(|e| invalid(section, key, e))
}

impl ClientConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            bus: BusConfig::default(),
            client: ClientSettings::default(),
            autoattack: AutoAttackSettings::default(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values. Fails if the file cannot
    /// be read or a present value cannot be parsed; in the latter case values
    /// read before the bad key have already been applied.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut ini = Ini::new();
        ini.load(&self.config_path).map_err(|reason| ConfigError::Load {
            path: self.config_path.clone(),
            reason,
        })?;

        // [bus]
        if let Some(depth) = get_uint(&ini, "bus", "backlog_warn")? {
            self.bus.backlog_warn = depth as usize;
        }

        // [client]
        if let Some(ticks) = get_uint(&ini, "client", "ticks")? {
            self.client.ticks = ticks;
        }
        if let Some(ms) = get_uint(&ini, "client", "tick_ms")? {
            self.client.tick_ms = ms;
        }
        if let Some(threads) = get_uint(&ini, "client", "network_threads")? {
            self.client.network_threads = threads as usize;
        }
        if let Some(inject) = get_bool(&ini, "client", "inject_faults")? {
            self.client.inject_faults = inject;
        }

        // [autoattack]
        if let Some(speed) = get_float(&ini, "autoattack", "speed")? {
            let speed = speed as f32;
            if attack_interval(speed).is_none() {
                return Err(invalid(
                    "autoattack",
                    "speed",
                    format!("{speed} is not a usable attack rate"),
                ));
            }
            self.autoattack.speed = speed;
        }
        if let Some(range) = get_float(&ini, "autoattack", "range")? {
            let range = range as f32;
            if !(range.is_finite() && range >= 0.0) {
                return Err(invalid(
                    "autoattack",
                    "range",
                    format!("{range} is not a distance"),
                ));
            }
            self.autoattack.range = range;
        }
        if let Some(strict) = get_bool(&ini, "autoattack", "strict")? {
            self.autoattack.strict = strict;
        }

        info!(
            "Loaded config: backlog_warn={}, ticks={} every {}ms, {} network threads, autoattack speed={} range={} strict={}",
            self.bus.backlog_warn,
            self.client.ticks,
            self.client.tick_ms,
            self.client.network_threads,
            self.autoattack.speed,
            self.autoattack.range,
            self.autoattack.strict
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let mut ini = Ini::new();

        ini.set("bus", "backlog_warn", Some(self.bus.backlog_warn.to_string()));

        ini.set("client", "ticks", Some(self.client.ticks.to_string()));
        ini.set("client", "tick_ms", Some(self.client.tick_ms.to_string()));
        ini.set(
            "client",
            "network_threads",
            Some(self.client.network_threads.to_string()),
        );
        ini.set(
            "client",
            "inject_faults",
            Some(self.client.inject_faults.to_string()),
        );

        ini.set("autoattack", "speed", Some(self.autoattack.speed.to_string()));
        ini.set("autoattack", "range", Some(self.autoattack.range.to_string()));
        ini.set("autoattack", "strict", Some(self.autoattack.strict.to_string()));

        ini.write(&self.config_path)
            .map_err(|source| ConfigError::Save {
                path: self.config_path.clone(),
                source,
            })?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
