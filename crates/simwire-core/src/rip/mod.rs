//! RIP version 2 routing engine (RFC 2453 subset).
//!
//! One [`RipEngine`] per router. The engine owns the RIP view of the
//! routing table and the protocol's three timers (regular update,
//! triggered update, per-route expiry/purge), all expressed as stored
//! deadlines checked in [`RipEngine::tick`]. Packet I/O happens through
//! returned [`RipAction`]s; the host delivers inbound datagrams via
//! [`RipEngine::handle_packet`].
//!
//! RIP is soft state: malformed or spoofed responses are dropped and
//! counted, never answered, and the next periodic update repairs any
//! resulting staleness.

mod config;
mod engine;
mod route;

pub use config::{RipConfig, RipInterfaceConfig, SplitHorizonMode};
pub use engine::{ImportKind, ImportedRoute, InterfaceProfile, RipAction, RipEngine};
pub use route::{RipRoute, RouteHealth, RouteOrigin};

/// Signal names emitted through the telemetry sink.
pub mod signals {
    /// Request datagrams sent (startup full-table solicitations).
    pub const SENT_REQUESTS: &str = "rip.sent_requests";
    /// Update rounds sent (regular and triggered).
    pub const SENT_UPDATES: &str = "rip.sent_updates";
    /// Response datagrams accepted for processing.
    pub const RCVD_RESPONSES: &str = "rip.rcvd_responses";
    /// Response datagrams rejected by validation.
    pub const BAD_RESPONSES: &str = "rip.bad_responses";
    /// Current route count, emitted after table changes.
    pub const NUM_ROUTES: &str = "rip.num_routes";
}
