//! vlt-controller
//!
//! The balance vault's state machine: init / save / subscribe plus the two
//! background writers (regenerator and hash roller).
//!
//! Architectural decisions:
//! - Instance-based: all state (balance, subscribers, task handles) lives in
//!   one `Arc`-shared controller constructed with an injected store, noise
//!   source, and config. No module-level singletons; independent instances
//!   coexist.
//! - Single-writer discipline: every blob+digest pair write (save, roll,
//!   reset) runs under one internal mutex, so concurrent periodic writers
//!   can never interleave into a transient blob/digest mismatch.
//! - Periodic work is a pure-ish tick method (`regen_tick`, `roll_once`)
//!   plus a thin interval task around it, so tests drive ticks directly and
//!   deterministically.
//! - Swallowed failures (roller ticks, subscriber panics) stay observable
//!   through an optional fault sink.

mod config;
mod controller;

pub use config::{ControllerConfig, RegenConfig, RollerConfig};
pub use controller::{BalanceController, FaultSite, FaultSink, Subscription};
