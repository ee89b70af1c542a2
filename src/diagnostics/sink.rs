//! Reporting sinks.
//!
//! A sink is called from inside a tick turn, on whatever thread runs it. Sinks
//! that need a particular thread (a UI, say) should forward the diagnostic,
//! which is what [`ChannelSink`] does.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{error, warn};

use crate::diagnostics::Diagnostic;

/// Displays or records a diagnostic.
pub trait ReportSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Writes diagnostics to the log at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        error!("{diagnostic}");
    }
}

/// Forwards diagnostics to a receiver owned by another thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Diagnostic>,
}

impl ChannelSink {
    /// Creates the sink and the receiving end for the displaying thread.
    pub fn new() -> (Self, Receiver<Diagnostic>) {
        let (tx, rx) = unbounded();
        (ChannelSink { tx }, rx)
    }
}

impl ReportSink for ChannelSink {
    fn report(&self, diagnostic: &Diagnostic) {
        if self.tx.send(diagnostic.clone()).is_err() {
            // Receiver gone; don't lose the report entirely.
            warn!("diagnostic receiver dropped, logging instead");
            LogSink.report(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Cause, Fault};
    use crate::events::Channel;

    fn sample() -> Diagnostic {
        Diagnostic::new(
            Fault::Panic("boom".into()),
            Cause::Event(Channel::Tick),
            "processing events",
            String::new(),
        )
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, rx) = ChannelSink::new();
        sink.report(&sample());
        assert_eq!(rx.try_recv().unwrap(), sample());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.report(&sample());
    }
}
