//! Hookbus headless client.
//!
//! Drives the event bus the way a game client would, without a game:
//! - a **simulation** thread fires ticks (plus the odd click and death),
//! - a **render** thread fires world and GUI render events,
//! - **network** threads fire packets and incoming chat,
//! - the main thread shows diagnostics forwarded by a [`ChannelSink`].
//!
//! The auto-attack and criticals mods run against a simulated world.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --ticks 100 --inject-faults
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};

use hookbus::config::ClientConfig;
use hookbus::diagnostics::{ChannelSink, ClientContext};
use hookbus::dispatch::EventManager;
use hookbus::events::chat::ChatInputEvent;
use hookbus::events::input::{EntityId, LeftClickEvent};
use hookbus::events::packet::{Packet, PacketInputEvent};
use hookbus::events::{Channel, Event};
use hookbus::mods::autoattack::AutoAttack;
use hookbus::mods::criticals::Criticals;
use hookbus::mods::{Combat, ModManager, Target};
use hookbus::observers::Observer;

const PACKET_KINDS: [&str; 5] = ["KeepAlive", "SpawnMob", "EntityMove", "Explosion", "TimeUpdate"];
const SCREENS: [&str; 3] = ["GuiInventory", "GuiChat", "GuiIngameMenu"];
const RENDER_FRAME: Duration = Duration::from_millis(16);

/// Hookbus headless client
#[derive(Parser)]
#[command(version, about = "Runs the hookbus event bus against a simulated game client.")]
struct Cli {
    /// Configuration file (INI).
    #[arg(long, value_name = "PATH", default_value = "./hookbus.ini")]
    config: PathBuf,

    /// Number of simulation ticks, overriding the configuration.
    #[arg(long)]
    ticks: Option<u64>,

    /// Register observers that panic, to exercise fault reporting.
    #[arg(long)]
    inject_faults: bool,

    /// Write the effective configuration back to the file and exit.
    #[arg(long)]
    save_config: bool,
}

/// Stand-in for the game world: one mob wandering around the player and a
/// GUI screen that opens and closes at random.
struct SimulatedWorld {
    mob_distance: Mutex<f32>,
    screen: Mutex<Option<&'static str>>,
    hits: AtomicUsize,
    hops: AtomicUsize,
}

impl SimulatedWorld {
    fn new() -> Self {
        Self {
            mob_distance: Mutex::new(8.0),
            screen: Mutex::new(None),
            hits: AtomicUsize::new(0),
            hops: AtomicUsize::new(0),
        }
    }

    fn step(&self) {
        if let Ok(mut distance) = self.mob_distance.lock() {
            *distance = (*distance + fastrand::f32() * 2.0 - 1.0).clamp(0.5, 10.0);
        }
        if fastrand::u8(..20) == 0
            && let Ok(mut screen) = self.screen.lock()
        {
            *screen = match *screen {
                Some(_) => None,
                None => Some(SCREENS[fastrand::usize(..SCREENS.len())]),
            };
        }
    }
}

impl Combat for SimulatedWorld {
    fn closest_target(&self) -> Option<Target> {
        let distance = *self.mob_distance.lock().ok()?;
        Some(Target {
            entity: EntityId(1),
            distance,
        })
    }

    fn attack(&self, _entity: EntityId) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn can_crit(&self) -> bool {
        true
    }

    fn crit_hop(&self) {
        self.hops.fetch_add(1, Ordering::Relaxed);
    }
}

impl ClientContext for SimulatedWorld {
    fn current_screen(&self) -> Option<String> {
        let screen = *self.screen.lock().ok()?;
        screen.map(str::to_string)
    }
}

fn random_packet() -> PacketInputEvent {
    let kind = PACKET_KINDS[fastrand::usize(..PACKET_KINDS.len())];
    let data = (0..fastrand::usize(..16)).map(|_| fastrand::u8(..)).collect();
    PacketInputEvent::new(Packet::new(kind, data))
}

/// Observers that fail on purpose.
fn register_faulty_observers(events: &EventManager) {
    events.subscribe(Observer::packet_input(Arc::new(|event: &PacketInputEvent| {
        if event.packet.kind == "Explosion" {
            panic!("explosion packet with {} bytes", event.packet.data.len());
        }
    })));

    let failed_once = AtomicBool::new(false);
    events.subscribe(Observer::gui_render(Arc::new(move || {
        if !failed_once.swap(true, Ordering::Relaxed) {
            panic!("overlay texture missing");
        }
    })));
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = ClientConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{e}; using defaults");
    }
    if let Some(ticks) = cli.ticks {
        config.client.ticks = ticks;
    }
    if cli.inject_faults {
        config.client.inject_faults = true;
    }

    if cli.save_config {
        match config.save_to_file() {
            Ok(()) => println!("Configuration written to {}", config.config_path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    info!("Hello! This is the hookbus headless client.");

    // --------------- Event bus ---------------
    let world = Arc::new(SimulatedWorld::new());
    let (sink, diagnostics) = ChannelSink::new();
    let events = EventManager::builder()
        .sink(Arc::new(sink))
        .client(world.clone())
        .config(config.bus.clone())
        .build();

    // --------------- Mods ---------------
    let criticals = Arc::new(Criticals::new(world.clone()));
    let autoattack = Arc::new(
        AutoAttack::new(config.autoattack.clone(), world.clone()).with_criticals(criticals.clone()),
    );
    let mut mods = ModManager::new(events.clone());
    mods.register(criticals);
    mods.register(autoattack.clone());
    mods.set_enabled("Criticals", true);
    mods.set_enabled("AutoAttack", true);

    let chat_lines = Arc::new(AtomicUsize::new(0));
    let lines = chat_lines.clone();
    events.subscribe(Observer::chat_input(Arc::new(move |event: &ChatInputEvent| {
        lines.fetch_add(1, Ordering::Relaxed);
        log::debug!("<server> {}", event.text);
    })));
    let deaths = Arc::new(AtomicUsize::new(0));
    let died = deaths.clone();
    events.subscribe(Observer::death(Arc::new(move || {
        died.fetch_add(1, Ordering::Relaxed);
        info!("You died!");
    })));

    if config.client.inject_faults {
        register_faulty_observers(&events);
    }
    events.flush();

    // --------------- Client threads ---------------
    let running = Arc::new(AtomicBool::new(true));
    let mut workers = Vec::new();

    {
        let events = events.clone();
        let running = running.clone();
        workers.push(thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                events.submit(Event::Render);
                events.submit(Event::GuiRender);
                thread::sleep(RENDER_FRAME);
            }
        }));
    }

    for n in 0..config.client.network_threads {
        let events = events.clone();
        let running = running.clone();
        workers.push(thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                if fastrand::u8(..4) == 0 {
                    events.submit(ChatInputEvent::new(format!("<player{n}> hello")));
                } else {
                    events.submit(random_packet());
                }
                thread::sleep(Duration::from_millis(fastrand::u64(5..30)));
            }
        }));
    }

    let simulation = {
        let events = events.clone();
        let world = world.clone();
        let ticks = config.client.ticks;
        let tick = Duration::from_millis(config.client.tick_ms);
        thread::spawn(move || {
            for n in 1..=ticks {
                world.step();
                events.submit(Event::Tick);
                if n % 10 == 0 {
                    events.submit(LeftClickEvent::on(EntityId(1)));
                }
                if n % 100 == 0 {
                    events.submit(Event::Death);
                }
                thread::sleep(tick);
            }
        })
    };

    // --------------- Diagnostics ---------------
    let mut shown = 0usize;
    while !simulation.is_finished() {
        match diagnostics.recv_timeout(Duration::from_millis(100)) {
            Ok(diagnostic) => {
                shown += 1;
                eprintln!("[diagnostic] {diagnostic}");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if simulation.join().is_err() {
        warn!("simulation thread panicked");
    }

    running.store(false, Ordering::Relaxed);
    for worker in workers {
        if worker.join().is_err() {
            warn!("client thread panicked");
        }
    }

    // Two more ticks: one applies late registrations, one shows them.
    events.submit(Event::Tick);
    events.submit(Event::Tick);
    for diagnostic in diagnostics.try_iter() {
        shown += 1;
        eprintln!("[diagnostic] {diagnostic}");
    }

    mods.set_enabled("AutoAttack", false);
    events.flush();

    println!("ticks:        {}", config.client.ticks);
    println!("attacks:      {}", autoattack.attacks());
    println!("crit hops:    {}", world.hops.load(Ordering::Relaxed));
    println!("chat lines:   {}", chat_lines.load(Ordering::Relaxed));
    println!("deaths:       {}", deaths.load(Ordering::Relaxed));
    println!("diagnostics:  {shown}");
    println!(
        "tick observers left: {}",
        events.observer_count(Channel::Tick)
    );
}
