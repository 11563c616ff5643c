//! Timer-driven network protocol engines for discrete-event simulation.
//!
//! Three engines share one architecture: pure state machines that take the
//! current instant as a parameter and return actions for the host to
//! execute. No engine performs I/O, reads a clock, or owns a thread —
//! the host (a simulator event loop, or a real socket driver) delivers
//! packets, fires ticks at the instants `next_wakeup()` reports, and
//! executes the returned send actions.
//!
//! - [`rip`] — RIP v2 distance-vector routing: route aging, split
//!   horizon, triggered updates.
//! - [`sctp`] — SCTP association address management: ASCONF/ASCONF-ACK
//!   exchange, chunk authentication framing, shared-key derivation.
//! - [`voip`] — VoIP talkspurt reconstruction and E-model MOS scoring.
//!
//! Randomness and (for drivers) time come from the injected
//! [`Environment`]; observations leave through the injected
//! [`TelemetrySink`]. Wire-level anomalies never abort an engine; only
//! configuration errors ([`ConfigError`]) are fatal, and only at build
//! time.

pub mod env;
pub mod error;
pub mod rip;
pub mod sctp;
pub mod telemetry;
pub mod voip;

pub use env::Environment;
pub use error::ConfigError;
pub use telemetry::{NullSink, TelemetrySink};
