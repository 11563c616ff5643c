//! Deterministic simulation harness for the simwire protocol engines.
//!
//! The engines are pure state machines; this crate supplies everything a
//! discrete-event run needs around them: a virtual clock with a seeded
//! RNG ([`SimEnv`]), a time-ordered event queue ([`EventQueue`]), a lossy
//! link model ([`LossyLink`]), and a recording telemetry sink. Same seed,
//! same run — every test here is reproducible bit for bit.
//!
//! The integration tests under `tests/` wire full scenarios: multi-router
//! RIP convergence and route aging, ASCONF exchanges over lossy paths,
//! and VoIP streams scored under configurable network conditions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod event_queue;
pub mod link;
pub mod sim_env;
pub mod telemetry;

pub use event_queue::EventQueue;
pub use link::LossyLink;
pub use sim_env::{SimEnv, SimInstant};
pub use telemetry::RecordingSink;
