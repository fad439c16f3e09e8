//! Core event loop for a single-speaker UDP voice reflector.
//!
//! This crate has no knowledge of configuration files, log sinks, or the
//! command line — see the `ysfreflectord` binary for that. It exposes the
//! leaf components described by the design (clock, transport, blocklist,
//! roster, arbiter) and the [`Reflector`] that couples them into the
//! running event loop.

pub mod arbiter;
pub mod blocklist;
pub mod callsign;
pub mod clock;
pub mod error;
pub mod frame;
pub mod reflector;
pub mod roster;
pub mod transport;

pub use arbiter::Arbiter;
pub use blocklist::Blocklist;
pub use callsign::Callsign;
pub use clock::Timer;
pub use error::{Error, Result};
pub use reflector::Reflector;
pub use roster::Roster;
pub use transport::Transport;
