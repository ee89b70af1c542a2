//! One-shot tick observer that shows a single diagnostic.
//!
//! Faults happen on arbitrary threads and in the middle of turns, so the
//! engine never calls the sink directly. Instead it registers a
//! [`DiagnosticDisplay`] on the tick channel. On its first tick the display
//! queues its own removal and reports; the removal is applied when that tick
//! turn drains its mutations, so the diagnostic is shown exactly once.

use std::sync::{Arc, Weak};

use log::debug;

use crate::diagnostics::{Diagnostic, ReportSink};
use crate::dispatch::WeakEventManager;
use crate::observers::{Observer, TickObserver};

pub struct DiagnosticDisplay {
    diagnostic: Diagnostic,
    sink: Arc<dyn ReportSink>,
    manager: WeakEventManager,
    this: Weak<DiagnosticDisplay>,
}

impl DiagnosticDisplay {
    /// Builds the display as a tick observer, ready to be subscribed.
    pub fn observer(
        diagnostic: Diagnostic,
        sink: Arc<dyn ReportSink>,
        manager: WeakEventManager,
    ) -> Observer {
        let display = Arc::new_cyclic(|this| DiagnosticDisplay {
            diagnostic,
            sink,
            manager,
            this: this.clone(),
        });
        Observer::tick(display)
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }
}

impl TickObserver for DiagnosticDisplay {
    fn on_tick(&self) {
        // Deregister first: if the sink panics we must not show it again.
        if let (Some(manager), Some(this)) = (self.manager.upgrade(), self.this.upgrade()) {
            manager.unsubscribe(&Observer::tick(this));
        }
        debug!("displaying diagnostic: {}", self.diagnostic);
        self.sink.report(&self.diagnostic);
    }

    fn name(&self) -> &'static str {
        "diagnostic display"
    }
}
