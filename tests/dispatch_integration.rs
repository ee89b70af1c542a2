//! Event manager integration tests.
//!
//! These exercise the engine through its public API only, the way mods and
//! client threads use it.
//!
//! # Test Categories
//!
//! 1. **Dispatch** - observers invoked once per turn, in registration order
//! 2. **Reentrancy** - submissions and registrations made from observers
//! 3. **Fault isolation** - panicking observers and deferred diagnostics
//! 4. **Dispatch faults** - aborted turns, dropped backlog, recovery
//! 5. **Concurrency** - many submitting threads, one turn at a time
//!
//! ```sh
//! cargo test --test dispatch_integration
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use hookbus::diagnostics::{Cause, ChannelSink, ClientContext, Diagnostic, Fault};
use hookbus::dispatch::EventManager;
use hookbus::events::chat::{ChatInputEvent, ChatOutputEvent};
use hookbus::events::packet::{Packet, PacketInputEvent};
use hookbus::events::{Channel, Event};
use hookbus::observers::{Observer, RenderObserver, TickObserver};

// =============================================================================
// Helpers
// =============================================================================

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Tick observer that appends its label to a shared log.
fn recorder(log: &Log, label: &'static str) -> Observer {
    let log = log.clone();
    Observer::tick(Arc::new(move || {
        log.lock().unwrap().push(label.to_string());
    }))
}

fn manager_with_sink() -> (EventManager, Receiver<Diagnostic>) {
    let (sink, rx) = ChannelSink::new();
    let manager = EventManager::builder().sink(Arc::new(sink)).build();
    (manager, rx)
}

struct PanicsOnce {
    fired: AtomicBool,
    calls: AtomicUsize,
}

impl PanicsOnce {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fired: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }
}

impl TickObserver for PanicsOnce {
    fn on_tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.fired.swap(true, Ordering::SeqCst) {
            panic!("Y failed");
        }
    }

    fn name(&self) -> &'static str {
        "Y"
    }
}

// =============================================================================
// 1. Dispatch
// =============================================================================

#[test]
fn test_all_observers_invoked_once_per_turn() {
    let manager = EventManager::new();
    let log = new_log();
    manager.subscribe(recorder(&log, "X"));
    manager.subscribe(recorder(&log, "Y"));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X", "Y"]);
}

#[test]
fn test_only_the_events_channel_is_invoked() {
    let manager = EventManager::new();
    let log = new_log();
    manager.subscribe(recorder(&log, "tick"));
    let l = log.clone();
    manager.subscribe(Observer::chat_output(Arc::new(move |e: &ChatOutputEvent| {
        l.lock().unwrap().push(format!("sent {}", e.message));
    })));
    manager.flush();

    manager.submit(ChatOutputEvent::new("hi"));
    manager.submit(Event::Death);
    assert_eq!(entries(&log), vec!["sent hi"]);
}

#[test]
fn test_duplicate_subscription_invoked_once() {
    let manager = EventManager::new();
    let log = new_log();
    let x = recorder(&log, "X");
    manager.subscribe(x.clone());
    manager.subscribe(x.clone());
    manager.flush();
    assert_eq!(manager.observer_count(Channel::Tick), 1);

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X"]);
}

#[test]
fn test_unsubscribe_absent_observer_is_noop() {
    let manager = EventManager::new();
    let log = new_log();
    let x = recorder(&log, "X");
    let never_added = recorder(&log, "Z");
    manager.subscribe(x.clone());
    manager.flush();

    manager.unsubscribe(&never_added);
    manager.unsubscribe(&never_added);
    manager.submit(Event::Tick);
    manager.submit(Event::Tick);

    assert_eq!(entries(&log), vec!["X", "X"]);
    assert!(manager.is_subscribed(&x));
}

#[test]
fn test_unsubscribe_is_by_identity() {
    let manager = EventManager::new();
    let log = new_log();
    let a = recorder(&log, "same");
    let b = recorder(&log, "same");
    manager.subscribe(a.clone());
    manager.subscribe(b.clone());
    manager.flush();

    manager.unsubscribe(&a);
    manager.flush();
    assert!(!manager.is_subscribed(&a));
    assert!(manager.is_subscribed(&b));
}

#[test]
fn test_mutations_apply_in_submission_order() {
    let manager = EventManager::new();
    let log = new_log();
    let x = recorder(&log, "X");
    manager.subscribe(x.clone());
    manager.unsubscribe(&x);
    manager.subscribe(x.clone());
    manager.flush();
    assert!(manager.is_subscribed(&x));

    manager.unsubscribe(&x);
    manager.subscribe(x.clone());
    manager.unsubscribe(&x);
    manager.flush();
    assert!(!manager.is_subscribed(&x));
}

// =============================================================================
// 2. Reentrancy
// =============================================================================

#[test]
fn test_submit_from_observer_runs_after_the_turn() {
    let manager = EventManager::new();
    let log = new_log();

    let weak = manager.downgrade();
    let l = log.clone();
    manager.subscribe(Observer::tick(Arc::new(move || {
        l.lock().unwrap().push("X before".into());
        if let Some(m) = weak.upgrade() {
            m.submit(Event::Render);
            assert_eq!(m.pending_len(), 1);
        }
        l.lock().unwrap().push("X after".into());
    })));
    let l = log.clone();
    manager.subscribe(Observer::tick(Arc::new(move || {
        l.lock().unwrap().push("Y".into());
    })));
    let l = log.clone();
    manager.subscribe(Observer::render(Arc::new(move || {
        l.lock().unwrap().push("render".into());
    })));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X before", "X after", "Y", "render"]);
    assert_eq!(manager.pending_len(), 0);
    assert!(!manager.is_busy());
}

#[test]
fn test_backlog_is_fifo() {
    let manager = EventManager::new();
    let log = new_log();

    let weak = manager.downgrade();
    manager.subscribe(Observer::tick(Arc::new(move || {
        if let Some(m) = weak.upgrade() {
            for text in ["one", "two", "three"] {
                m.submit(ChatInputEvent::new(text));
            }
        }
    })));
    let l = log.clone();
    manager.subscribe(Observer::chat_input(Arc::new(move |e: &ChatInputEvent| {
        l.lock().unwrap().push(e.text.clone());
    })));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["one", "two", "three"]);
}

#[test]
fn test_subscribe_from_observer_waits_for_next_turn() {
    let manager = EventManager::new();
    let log = new_log();
    let late = recorder(&log, "Z");

    let weak = manager.downgrade();
    let l = log.clone();
    let added = AtomicBool::new(false);
    manager.subscribe(Observer::tick(Arc::new(move || {
        l.lock().unwrap().push("X".into());
        if !added.swap(true, Ordering::SeqCst)
            && let Some(m) = weak.upgrade()
        {
            m.subscribe(late.clone());
        }
    })));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X"]);
    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X", "X", "Z"]);
}

/// Removes itself on its first invocation.
struct SelfRemoving {
    manager: hookbus::dispatch::WeakEventManager,
    this: std::sync::Weak<SelfRemoving>,
    calls: AtomicUsize,
}

impl TickObserver for SelfRemoving {
    fn on_tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let (Some(m), Some(this)) = (self.manager.upgrade(), self.this.upgrade()) {
            m.unsubscribe(&Observer::tick(this));
        }
    }
}

#[test]
fn test_unsubscribe_from_observer_keeps_current_snapshot() {
    let manager = EventManager::new();
    let log = new_log();
    let removing = Arc::new_cyclic(|this| SelfRemoving {
        manager: manager.downgrade(),
        this: this.clone(),
        calls: AtomicUsize::new(0),
    });
    manager.subscribe(Observer::tick(removing.clone()));
    manager.subscribe(recorder(&log, "after"));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(removing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&log), vec!["after"]);

    manager.submit(Event::Tick);
    assert_eq!(removing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&log), vec!["after", "after"]);
    assert_eq!(manager.observer_count(Channel::Tick), 1);
}

// =============================================================================
// 3. Fault isolation
// =============================================================================

#[test]
fn test_faulting_observer_reported_once_on_next_tick() {
    let (manager, diagnostics) = manager_with_sink();
    let log = new_log();
    let y = PanicsOnce::new();
    manager.subscribe(recorder(&log, "X"));
    manager.subscribe(Observer::tick(y.clone()));
    manager.subscribe(recorder(&log, "W"));
    manager.flush();

    manager.submit(Event::Tick);
    assert_eq!(entries(&log), vec!["X", "W"]);
    assert!(diagnostics.try_recv().is_err());
    assert_eq!(manager.observer_count(Channel::Tick), 4);

    manager.submit(Event::Tick);
    let diagnostic = diagnostics.try_recv().expect("diagnostic on second tick");
    assert_eq!(diagnostic.fault, Fault::Panic("Y failed".into()));
    assert_eq!(diagnostic.observer(), Some(&Observer::tick(y.clone())));
    assert_eq!(diagnostic.action, "updating");
    assert!(diagnostic.context.is_empty());
    assert!(diagnostics.try_recv().is_err());

    manager.submit(Event::Tick);
    assert!(diagnostics.try_recv().is_err());
    assert_eq!(manager.observer_count(Channel::Tick), 3);
    assert_eq!(y.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_fault_on_other_channel_reported_with_context() {
    let (manager, diagnostics) = manager_with_sink();
    let survivors = Arc::new(AtomicUsize::new(0));
    manager.subscribe(Observer::packet_input(Arc::new(|_: &PacketInputEvent| {
        panic!("bad packet");
    })));
    let s = survivors.clone();
    manager.subscribe(Observer::packet_input(Arc::new(move |_: &PacketInputEvent| {
        s.fetch_add(1, Ordering::SeqCst);
    })));
    manager.flush();

    manager.submit(PacketInputEvent::new(Packet::new("Explosion", vec![0; 4])));
    assert_eq!(survivors.load(Ordering::SeqCst), 1);

    manager.submit(Event::Tick);
    let diagnostic = diagnostics.try_recv().expect("diagnostic after tick");
    assert_eq!(diagnostic.action, "receiving packet");
    assert_eq!(diagnostic.context, "Packet: Explosion");
    assert_eq!(
        diagnostic.observer().map(Observer::channel),
        Some(Channel::PacketInput)
    );
    assert!(matches!(diagnostic.cause, Cause::Observer(_)));

    // The faulty observer stays registered and keeps failing in isolation.
    manager.submit(PacketInputEvent::new(Packet::new("KeepAlive", vec![])));
    assert_eq!(survivors.load(Ordering::SeqCst), 2);
}

struct Screen(&'static str);

impl ClientContext for Screen {
    fn current_screen(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[test]
fn test_render_fault_names_open_screen() {
    let (sink, diagnostics) = ChannelSink::new();
    let manager = EventManager::builder()
        .sink(Arc::new(sink))
        .client(Arc::new(Screen("GuiInventory")))
        .build();
    manager.subscribe(Observer::gui_render(Arc::new(|| {
        panic!("no font");
    })));
    manager.flush();

    manager.submit(Event::GuiRender);
    manager.submit(Event::Tick);
    let diagnostic = diagnostics.try_recv().expect("diagnostic after tick");
    assert_eq!(diagnostic.action, "rendering GUI");
    assert_eq!(diagnostic.context, "GUI screen: GuiInventory");
}

#[test]
fn test_render_fault_without_screen() {
    let (manager, diagnostics) = manager_with_sink();
    manager.subscribe(Observer::render(Arc::new(|| {
        panic!("no mesh");
    })));
    manager.flush();

    manager.submit(Event::Render);
    manager.submit(Event::Tick);
    let diagnostic = diagnostics.try_recv().expect("diagnostic after tick");
    assert_eq!(diagnostic.context, "GUI screen: null");
}

#[test]
fn test_each_fault_displayed_exactly_once() {
    let (manager, diagnostics) = manager_with_sink();
    manager.subscribe(Observer::death(Arc::new(|| {
        panic!("dead twice");
    })));
    manager.flush();

    manager.submit(Event::Death);
    manager.submit(Event::Death);
    manager.submit(Event::Death);
    for _ in 0..5 {
        manager.submit(Event::Tick);
    }
    let all: Vec<Diagnostic> = diagnostics.try_iter().collect();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|d| d.action == "dying"));
    assert_eq!(manager.observer_count(Channel::Tick), 0);
}

// =============================================================================
// 4. Dispatch faults
// =============================================================================

/// Client context that cannot answer.
struct BrokenContext;

impl ClientContext for BrokenContext {
    fn current_screen(&self) -> Option<String> {
        panic!("screen state unavailable");
    }
}

#[test]
fn test_dispatch_fault_drops_backlog_and_recovers() {
    let (sink, diagnostics) = ChannelSink::new();
    let manager = EventManager::builder()
        .sink(Arc::new(sink))
        .client(Arc::new(BrokenContext))
        .build();
    let chats = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));

    let weak = manager.downgrade();
    manager.subscribe(Observer::render(Arc::new(move || {
        if let Some(m) = weak.upgrade() {
            m.submit(ChatInputEvent::new("lost 1"));
            m.submit(ChatInputEvent::new("lost 2"));
        }
        panic!("render failed");
    })));
    let a = after.clone();
    manager.subscribe(Observer::render(Arc::new(move || {
        a.fetch_add(1, Ordering::SeqCst);
    })));
    let c = chats.clone();
    manager.subscribe(Observer::chat_input(Arc::new(move |_: &ChatInputEvent| {
        c.fetch_add(1, Ordering::SeqCst);
    })));
    manager.flush();

    manager.submit(Event::Render);

    // Turn aborted: later observers skipped, backlog dropped, engine idle.
    assert_eq!(after.load(Ordering::SeqCst), 0);
    assert_eq!(chats.load(Ordering::SeqCst), 0);
    assert_eq!(manager.pending_len(), 0);
    assert!(!manager.is_busy());

    // Still usable.
    manager.submit(ChatInputEvent::new("fresh"));
    assert_eq!(chats.load(Ordering::SeqCst), 1);

    manager.submit(Event::Tick);
    let diagnostic = diagnostics.try_recv().expect("dispatch fault reported");
    assert_eq!(diagnostic.cause, Cause::Event(Channel::Render));
    assert_eq!(diagnostic.action, "processing events");
    assert!(diagnostic.context.starts_with("Event type: Render; unreported fault in "));
    assert!(diagnostic.context.ends_with("panicked: render failed"));
    assert_eq!(diagnostic.fault, Fault::Panic("screen state unavailable".into()));
    assert!(diagnostics.try_recv().is_err());
}

struct Overlay;

impl RenderObserver for Overlay {
    fn on_render(&self) {
        panic!("shader missing");
    }

    fn name(&self) -> &'static str {
        "Overlay"
    }
}

#[test]
fn test_dispatch_fault_names_the_unreported_observer() {
    let (sink, diagnostics) = ChannelSink::new();
    let manager = EventManager::builder()
        .sink(Arc::new(sink))
        .client(Arc::new(BrokenContext))
        .build();
    manager.subscribe(Observer::render(Arc::new(Overlay)));
    manager.flush();

    manager.submit(Event::Render);
    manager.submit(Event::Tick);

    let diagnostic = diagnostics.try_recv().expect("dispatch fault reported");
    assert_eq!(diagnostic.observer(), None);
    assert_eq!(
        diagnostic.context,
        "Event type: Render; unreported fault in Overlay: panicked: shader missing"
    );
    assert!(diagnostics.try_recv().is_err());
}

// =============================================================================
// 5. Concurrency
// =============================================================================

#[test]
fn test_one_turn_at_a_time_across_threads() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let manager = EventManager::new();
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let (active, max_active, total) = (active.clone(), max_active.clone(), total.clone());
        manager.subscribe(Observer::tick(Arc::new(move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_micros(50));
            total.fetch_add(1, Ordering::SeqCst);
            active.fetch_sub(1, Ordering::SeqCst);
        })));
    }
    manager.flush();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    manager.submit(Event::Tick);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert_eq!(total.load(Ordering::SeqCst), THREADS * PER_THREAD * 2);
    assert!(!manager.is_busy());
    assert_eq!(manager.pending_len(), 0);
}

#[test]
fn test_busy_submissions_keep_per_thread_order() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 100;

    let manager = EventManager::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    manager.subscribe(Observer::chat_input(Arc::new(move |e: &ChatInputEvent| {
        s.lock().unwrap().push(e.text.clone());
    })));
    manager.flush();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    manager.submit(ChatInputEvent::new(format!("{t}:{i}")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    for t in 0..THREADS {
        let order: Vec<usize> = seen
            .iter()
            .filter_map(|s| s.split_once(':'))
            .filter(|(thread, _)| thread.parse::<usize>().ok() == Some(t))
            .map(|(_, i)| i.parse().unwrap())
            .collect();
        assert_eq!(order, (0..PER_THREAD).collect::<Vec<_>>());
    }
}

#[test]
fn test_subscriptions_from_many_threads_all_land() {
    let manager = EventManager::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            let hits = hits.clone();
            thread::spawn(move || {
                manager.subscribe(Observer::death(Arc::new(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                })));
                manager.submit(Event::Tick);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    manager.flush();

    manager.submit(Event::Death);
    assert_eq!(manager.observer_count(Channel::Death), 8);
    assert_eq!(hits.load(Ordering::SeqCst), 8);
}
