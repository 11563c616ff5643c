//! RIP route table entries.

use std::net::Ipv4Addr;

use simwire_proto::Ipv4Net;

/// Where a route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrigin {
    /// Learned from a neighbor's response.
    Rte,
    /// Installed by the operator.
    Static,
    /// The default route (0.0.0.0/0).
    Default,
    /// Imported from another routing protocol.
    Redistribute,
    /// A directly connected interface network.
    Interface,
}

impl RouteOrigin {
    /// True for routes that never expire (everything the router did not
    /// learn from a peer).
    #[must_use]
    pub fn is_zero_touch(self) -> bool {
        !matches!(self, Self::Rte)
    }
}

/// Lifecycle position of a route relative to its deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteHealth {
    /// Usable; advertise its stored metric.
    Valid,
    /// Past expiry; must be advertised as unreachable.
    Expired,
    /// Past the purge deadline; must be removed.
    Purged,
}

/// Expiry/purge deadlines of a learned route.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadlines<I> {
    /// When the route stops being usable.
    pub expire_at: I,
    /// When the route is removed entirely.
    pub purge_at: I,
}

/// One entry in the RIP route table.
///
/// Invariants: `metric <= 16`; `deadlines` is `None` exactly for
/// zero-touch origins; an entry with metric 16 survives only until its
/// purge deadline.
#[derive(Debug, Clone)]
pub struct RipRoute<I> {
    /// Destination network.
    pub dest: Ipv4Net,
    /// Forwarding next hop; `None` means directly connected.
    pub next_hop: Option<Ipv4Addr>,
    /// Interface the route was learned or configured on.
    pub iface: u32,
    /// Provenance of the entry.
    pub origin: RouteOrigin,
    /// Cost to reach the destination, 0..=16.
    pub metric: u32,
    /// Opaque route tag, propagated in advertisements.
    pub tag: u16,
    /// Set when the route changed since the last triggered update.
    pub changed: bool,
    /// Neighbor the route was learned from (`Rte` origin only).
    pub from: Option<Ipv4Addr>,
    /// Instant of the last valid update (`Rte` origin only).
    pub last_update: Option<I>,
    pub(crate) deadlines: Option<Deadlines<I>>,
}

impl<I: Copy + Ord> RipRoute<I> {
    /// Lifecycle position at `now`. Zero-touch routes are always valid.
    #[must_use]
    pub fn health(&self, now: I) -> RouteHealth {
        match self.deadlines {
            None => RouteHealth::Valid,
            Some(d) if now >= d.purge_at => RouteHealth::Purged,
            Some(d) if now >= d.expire_at => RouteHealth::Expired,
            Some(_) => RouteHealth::Valid,
        }
    }

    /// Expiry deadline, if the route ages.
    #[must_use]
    pub fn expire_at(&self) -> Option<I> {
        self.deadlines.map(|d| d.expire_at)
    }

    /// Purge deadline, if the route ages.
    #[must_use]
    pub fn purge_at(&self) -> Option<I> {
        self.deadlines.map(|d| d.purge_at)
    }
}
