//! Configuration-time errors.
//!
//! Wire-level anomalies are not errors to the engines — they are dropped
//! and counted. The only failures that surface as `Result::Err` are
//! configuration inconsistencies detected while building an engine, which
//! indicate an unusable instance and abort startup.

use thiserror::Error;

/// Fatal configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A route or interface config referenced an interface that does not
    /// exist on this host.
    #[error("unknown interface: {name}")]
    UnknownInterface {
        /// The name that failed to resolve
        name: String,
    },

    /// Two interface profiles share a name or id.
    #[error("duplicate interface: {name}")]
    DuplicateInterface {
        /// The colliding name
        name: String,
    },

    /// A router was configured with no interfaces at all.
    #[error("no interfaces configured")]
    NoInterfaces,

    /// A configured metric is outside the protocol's valid range.
    #[error("invalid metric {metric} (valid range 1..=16)")]
    InvalidMetric {
        /// The offending value
        metric: u32,
    },

    /// An association was configured without addresses on one side.
    #[error("empty {side} address list")]
    EmptyAddressList {
        /// Which endpoint is missing addresses
        side: &'static str,
    },

    /// An association was configured with an empty random key vector.
    #[error("empty {side} key vector")]
    EmptyKeyVector {
        /// Which endpoint is missing key material
        side: &'static str,
    },
}
