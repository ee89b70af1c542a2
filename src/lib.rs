//! Hookbus library.
//!
//! An in-process event bus for a game client add-on. The client's simulation,
//! network and render threads fire typed events; mods register observers for
//! the channels they care about. The bus guarantees:
//!
//! - one dispatch turn at a time, process-wide, without blocking submitters,
//! - no lost events while a turn is open (they are queued and run in order),
//! - registration changes that never disturb the turn in progress,
//! - a panicking observer is reported once and never affects the others.
//!
//! # Project Structure
//!
//! - [`events`] – the closed channel set and event payloads
//! - [`observers`] – one capability trait per channel and the [`Observer`] handle
//! - [`dispatch`] – the [`EventManager`] engine
//! - [`diagnostics`] – faults, diagnostics and reporting sinks
//! - [`config`] – INI configuration
//! - [`mods`] – toggleable features built on the bus
//!
//! [`Observer`]: observers::Observer
//! [`EventManager`]: dispatch::EventManager

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod mods;
pub mod observers;

pub use dispatch::EventManager;
pub use events::{Channel, Event};
pub use observers::Observer;
