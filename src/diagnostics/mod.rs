//! Faults, diagnostics and the sinks that display them.
//!
//! When an observer panics, the engine turns the panic into a [`Diagnostic`]
//! and hands it to a [`ReportSink`] on the next tick turn rather than on the
//! faulting thread.
//!
//! Submodules:
//! - [`context`] – the [`ClientContext`] collaborator and fault context strings
//! - [`display`] – the one-shot tick observer that shows a diagnostic once
//! - [`sink`] – [`ReportSink`] and the bundled sinks
pub mod context;
pub mod display;
pub mod sink;

use std::any::Any;
use std::fmt;

use crate::events::Channel;
use crate::observers::Observer;

pub use context::{ClientContext, NoScreen};
pub use sink::{ChannelSink, LogSink, ReportSink};

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// Code running inside a turn panicked.
    #[error("panicked: {0}")]
    Panic(String),
    /// An observer was handed an event of a channel it does not observe.
    #[error("observer on {observer} received a {event} event")]
    ChannelMismatch { observer: Channel, event: Channel },
}

impl Fault {
    /// Builds a fault from a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Fault::Panic(message)
    }
}

/// Who faulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// A single observer's invocation.
    Observer(Observer),
    /// The dispatch of an event on this channel.
    Event(Channel),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Observer(observer) => {
                write!(f, "{} on {}", observer.name(), observer.channel())
            }
            Cause::Event(channel) => write!(f, "{channel} event"),
        }
    }
}

/// A fault report, consumed once by a [`ReportSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub fault: Fault,
    pub cause: Cause,
    /// What the client was doing, e.g. "rendering GUI".
    pub action: &'static str,
    /// Extra detail such as the open screen or the offending packet kind.
    pub context: String,
}

impl Diagnostic {
    pub fn new(fault: Fault, cause: Cause, action: &'static str, context: String) -> Self {
        Diagnostic {
            fault,
            cause,
            action,
            context,
        }
    }

    /// The faulting observer, if an observer (not the dispatch itself) faulted.
    pub fn observer(&self) -> Option<&Observer> {
        match &self.cause {
            Cause::Observer(observer) => Some(observer),
            Cause::Event(_) => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error while {} ({}): {}", self.action, self.cause, self.fault)?;
        if !self.context.is_empty() {
            write!(f, " [{}]", self.context)?;
        }
        Ok(())
    }
}
