//! Event dispatch engine.
//!
//! - [`manager`] – [`EventManager`]: submission, turns, backlog, fault containment
//! - [`observerset`] – per-channel observer sets and deferred [`Mutation`]s
//!
//! Guarantees, for any number of threads calling into one engine:
//! - at most one turn runs at a time,
//! - events submitted during a turn are queued, never dropped (except when a
//!   turn aborts with a dispatch fault) and are processed in submission order
//!   before the turn-holding `submit` returns,
//! - subscriptions and removals never affect the turn in progress,
//! - a panicking observer never stops the others.
pub mod manager;
pub mod observerset;

pub use manager::{EventManager, EventManagerBuilder, WeakEventManager};
pub use observerset::{Mutation, ObserverSets};
