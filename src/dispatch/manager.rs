//! The event manager: turn guard, backlog and mutation drain.
//!
//! All shared state lives behind one mutex ([`DispatchState`]). The lock is
//! only ever held for bookkeeping; observer code, sinks and the client
//! context always run with it released, so observers may freely submit,
//! subscribe and unsubscribe from inside their own invocation. That includes
//! `Drop` impls: observer handles released by the sets are dropped only after
//! the lock is given back.
//!
//! A turn, start to finish:
//! 1. snapshot the observer set of the event's channel,
//! 2. invoke every snapshot member, each under its own `catch_unwind`,
//! 3. apply queued mutations in FIFO order to the live sets.
//!
//! The thread that opened the turn keeps the busy flag while it works through
//! events queued in the meantime, and clears it in the same critical section
//! that finds the backlog empty.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, error, info, trace, warn};

use crate::config::BusConfig;
use crate::diagnostics::context::fault_context;
use crate::diagnostics::display::DiagnosticDisplay;
use crate::diagnostics::{Cause, ClientContext, Diagnostic, Fault, LogSink, NoScreen, ReportSink};
use crate::dispatch::observerset::{Mutation, ObserverSets};
use crate::events::{Channel, Event};
use crate::observers::Observer;

const DISPATCH_ACTION: &str = "processing events";

/// Whether a backlog that just grew to `depth` should be warned about.
/// Fires once per excursion past `threshold`; `0` never fires.
fn backlog_reached(depth: usize, threshold: usize) -> bool {
    threshold > 0 && depth == threshold
}

/// Why a turn stopped before finishing.
struct TurnAbort {
    fault: Fault,
    /// An observer fault that could not be reported because describing it
    /// failed: the observer's name and its fault.
    unreported: Option<(&'static str, Fault)>,
}

impl From<Fault> for TurnAbort {
    fn from(fault: Fault) -> Self {
        TurnAbort {
            fault,
            unreported: None,
        }
    }
}

#[derive(Default)]
struct DispatchState {
    busy: bool,
    pending: VecDeque<Event>,
    mutations: VecDeque<Mutation>,
    observers: ObserverSets,
}

struct Shared {
    state: Mutex<DispatchState>,
    sink: Arc<dyn ReportSink>,
    client: Arc<dyn ClientContext>,
    config: BusConfig,
}

/// Handle to the process-wide event dispatch engine.
///
/// Cloning is cheap and every clone drives the same engine; hand clones to
/// each subsystem that fires or observes events.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<Shared>,
}

/// Non-owning handle, for observers that need to reach the engine that
/// invokes them without keeping it alive.
#[derive(Clone, Default)]
pub struct WeakEventManager {
    inner: Weak<Shared>,
}

impl WeakEventManager {
    pub fn upgrade(&self) -> Option<EventManager> {
        self.inner.upgrade().map(|inner| EventManager { inner })
    }
}

/// Builder for [`EventManager`].
pub struct EventManagerBuilder {
    sink: Arc<dyn ReportSink>,
    client: Arc<dyn ClientContext>,
    config: BusConfig,
}

impl Default for EventManagerBuilder {
    fn default() -> Self {
        Self {
            sink: Arc::new(LogSink),
            client: Arc::new(NoScreen),
            config: BusConfig::default(),
        }
    }
}

impl EventManagerBuilder {
    /// Where diagnostics end up. Defaults to [`LogSink`].
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Client state used to describe render faults. Defaults to [`NoScreen`].
    pub fn client(mut self, client: Arc<dyn ClientContext>) -> Self {
        self.client = client;
        self
    }

    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> EventManager {
        info!(
            "event manager initialized (backlog warning at {})",
            self.config.backlog_warn
        );
        EventManager {
            inner: Arc::new(Shared {
                state: Mutex::new(DispatchState::default()),
                sink: self.sink,
                client: self.client,
                config: self.config,
            }),
        }
    }
}

/// Marks the busy flag as owned by the current call to `submit`.
///
/// Dropped without being closed only while unwinding; it then releases the
/// flag so the engine cannot stay busy forever.
struct OpenTurn<'a> {
    manager: &'a EventManager,
    closed: bool,
}

impl OpenTurn<'_> {
    /// Next backlog event, or `None` after releasing the busy flag.
    fn next_or_close(&mut self) -> Option<Event> {
        let mut state = self.manager.lock_state();
        let next = state.pending.pop_front();
        if next.is_none() {
            state.busy = false;
            self.closed = true;
        }
        next
    }
}

impl Drop for OpenTurn<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut state = self.manager.lock_state();
        let dropped = state.pending.len();
        state.pending.clear();
        state.busy = false;
        error!("turn left open by a panic; released busy flag, dropped {dropped} pending events");
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// Engine with the default sink, client context and configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EventManagerBuilder {
        EventManagerBuilder::default()
    }

    pub fn downgrade(&self) -> WeakEventManager {
        WeakEventManager {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        // Nothing user-supplied runs under this lock, so a poisoned state is
        // still consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcasts `event` to every observer of its channel.
    ///
    /// If no turn is open, the event is dispatched right away on the calling
    /// thread, followed by anything other callers queued meanwhile. If a turn
    /// is open (on this thread or another) the event is queued and this
    /// returns immediately. Never panics on behalf of an observer.
    pub fn submit(&self, event: impl Into<Event>) {
        let mut event = event.into();
        {
            let mut state = self.lock_state();
            if state.busy {
                trace!("turn open, queueing {} event", event.channel());
                state.pending.push_back(event);
                let depth = state.pending.len();
                if backlog_reached(depth, self.inner.config.backlog_warn) {
                    warn!("event backlog reached {depth} pending events");
                }
                return;
            }
            state.busy = true;
        }

        let mut turn = OpenTurn {
            manager: self,
            closed: false,
        };
        loop {
            self.run_turn_contained(event);
            match turn.next_or_close() {
                Some(next) => event = next,
                None => break,
            }
        }
    }

    /// Queues `observer` for addition to its channel's set.
    ///
    /// Takes effect when the current (or next) turn drains its mutations, or
    /// on [`flush`](Self::flush) while idle.
    pub fn subscribe(&self, observer: Observer) {
        trace!("queueing add of {} on {}", observer.name(), observer.channel());
        self.lock_state().mutations.push_back(Mutation::Add(observer));
    }

    /// Queues removal of `observer`. Removing an absent observer is a no-op.
    pub fn unsubscribe(&self, observer: &Observer) {
        trace!("queueing removal of {} on {}", observer.name(), observer.channel());
        self.lock_state()
            .mutations
            .push_back(Mutation::Remove(observer.clone()));
    }

    /// Applies queued mutations now if no turn is open.
    ///
    /// Returns `false` when a turn is open; that turn applies them instead.
    pub fn flush(&self) -> bool {
        let released = {
            let mut state = self.lock_state();
            if state.busy {
                return false;
            }
            Self::drain_mutations(&mut state)
        };
        drop(released);
        true
    }

    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    /// Events waiting for the open turn to finish.
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Subscribe/unsubscribe operations not yet applied.
    pub fn pending_mutations(&self) -> usize {
        self.lock_state().mutations.len()
    }

    /// Live observers on `channel`.
    pub fn observer_count(&self, channel: Channel) -> usize {
        self.lock_state().observers.len(channel)
    }

    pub fn is_subscribed(&self, observer: &Observer) -> bool {
        self.lock_state().observers.contains(observer)
    }

    /// Runs one turn, turning any fault that escapes it into a dispatch
    /// fault: the backlog is dropped and a diagnostic is scheduled.
    fn run_turn_contained(&self, event: Event) {
        let channel = event.channel();
        let TurnAbort { fault, unreported } =
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_turn(&event))) {
                Ok(Ok(())) => return,
                Ok(Err(abort)) => abort,
                Err(payload) => Fault::from_panic(payload).into(),
            };
        error!("dispatch of {channel} event aborted: {fault}");

        let dropped = {
            let mut state = self.lock_state();
            let dropped = state.pending.len();
            state.pending.clear();
            dropped
        };
        if dropped > 0 {
            warn!("dropped {dropped} pending events after aborted {channel} turn");
        }

        let context = match unreported {
            Some((name, lost)) => {
                format!("Event type: {channel}; unreported fault in {name}: {lost}")
            }
            None => format!("Event type: {channel}"),
        };
        self.schedule_report(Diagnostic::new(
            fault,
            Cause::Event(channel),
            DISPATCH_ACTION,
            context,
        ));
    }

    /// Runs one event through a snapshot of its channel's observers, then
    /// applies queued mutations.
    ///
    /// An observer fault is reported through a diagnostic and the turn goes
    /// on. If the client context panics while that fault is being described,
    /// the turn aborts instead, and the observer fault travels in the
    /// [`TurnAbort`] so the dispatch diagnostic can mention it.
    fn run_turn(&self, event: &Event) -> Result<(), TurnAbort> {
        let channel = event.channel();
        let snapshot = self.lock_state().observers.snapshot(channel);
        trace!("{channel} turn: {} observers", snapshot.len());

        for observer in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.notify(event))) {
                Ok(Ok(())) => {}
                Ok(Err(fault)) => return Err(fault.into()),
                Err(payload) => {
                    let fault = Fault::from_panic(payload);
                    warn!(
                        "observer {} faulted while {}: {fault}",
                        observer.name(),
                        channel.action()
                    );
                    let context = match panic::catch_unwind(AssertUnwindSafe(|| {
                        fault_context(event, self.inner.client.as_ref())
                    })) {
                        Ok(context) => context,
                        Err(payload) => {
                            return Err(TurnAbort {
                                fault: Fault::from_panic(payload),
                                unreported: Some((observer.name(), fault)),
                            });
                        }
                    };
                    self.schedule_report(Diagnostic::new(
                        fault,
                        Cause::Observer(observer.clone()),
                        channel.action(),
                        context,
                    ));
                }
            }
        }

        let released = Self::drain_mutations(&mut self.lock_state());
        drop(released);
        Ok(())
    }

    /// Applies every queued mutation in FIFO order.
    ///
    /// Returns the observer handles the sets let go of. The caller must drop
    /// them after releasing the lock, since dropping the last handle runs the
    /// observer's `Drop`.
    #[must_use]
    fn drain_mutations(state: &mut DispatchState) -> Vec<Observer> {
        let mut released = Vec::new();
        let queued = state.mutations.len();
        if queued == 0 {
            return released;
        }
        let mut changed = 0;
        while let Some(mutation) = state.mutations.pop_front() {
            if state.observers.apply(mutation, &mut released) {
                changed += 1;
            }
        }
        debug!("applied {queued} queued mutations ({changed} changed a set)");
        released
    }

    /// Registers a one-shot tick observer that hands `diagnostic` to the sink.
    fn schedule_report(&self, diagnostic: Diagnostic) {
        let display =
            DiagnosticDisplay::observer(diagnostic, Arc::clone(&self.inner.sink), self.downgrade());
        self.subscribe(display);
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("EventManager")
            .field("busy", &state.busy)
            .field("pending", &state.pending.len())
            .field("mutations", &state.mutations.len())
            .finish()
    }
}
