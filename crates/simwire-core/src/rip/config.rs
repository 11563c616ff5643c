//! RIP configuration surface.
//!
//! Hosts load these from structured configuration; parsing lives outside
//! the engine. All values are immutable once the engine is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How route advertisements are filtered toward the interface a route was
/// learned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitHorizonMode {
    /// No filtering; advertise everything everywhere.
    Disabled,
    /// Suppress routes on their learn interface.
    Plain,
    /// Advertise routes on their learn interface with metric 16.
    PoisonedReverse,
}

/// Per-interface RIP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipInterfaceConfig {
    /// Interface this config binds to, by name.
    pub name: String,
    /// Cost added to routes learned over this interface.
    pub metric: u32,
    /// Split-horizon behavior on this interface.
    pub split_horizon: SplitHorizonMode,
}

impl RipInterfaceConfig {
    /// Default settings for `name`: cost 1, plain split horizon.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), metric: 1, split_horizon: SplitHorizonMode::Plain }
    }
}

/// Router-wide RIP timing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipConfig {
    /// Interval between unsolicited full-table responses.
    pub update_interval: Duration,
    /// Time after the last valid update before a route expires.
    pub route_expiry: Duration,
    /// Time an expired route is retained before removal.
    pub route_purge: Duration,
    /// Lower bound of the triggered-update holddown jitter.
    pub triggered_delay_min: Duration,
    /// Upper bound of the triggered-update holddown jitter.
    pub triggered_delay_max: Duration,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(30),
            route_expiry: Duration::from_secs(180),
            route_purge: Duration::from_secs(120),
            triggered_delay_min: Duration::from_secs(1),
            triggered_delay_max: Duration::from_secs(5),
        }
    }
}
