//! The RIP routing engine state machine.
//!
//! Pure state machine in the action pattern: methods take the current
//! instant and return [`RipAction`]s for the driver to execute. The engine
//! never performs I/O and never reads a clock; determinism under a seeded
//! environment follows.

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    ops::{Add, Sub},
    time::Duration,
};

use simwire_proto::{
    Ipv4Net, RipCommand, RipEntry, RipPacket,
    rip::{AF_INET, INFINITE_METRIC, MAX_ENTRIES_PER_PACKET, RIP_MULTICAST_GROUP, RIP_UDP_PORT},
};
use tracing::{debug, trace};

use super::{
    RipConfig, RipInterfaceConfig, SplitHorizonMode,
    route::{Deadlines, RipRoute, RouteHealth, RouteOrigin},
    signals,
};
use crate::{env::Environment, error::ConfigError, telemetry::TelemetrySink};

/// A host interface the engine may run RIP on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceProfile {
    /// Host-assigned interface id.
    pub id: u32,
    /// Interface name, matched against [`RipInterfaceConfig::name`].
    pub name: String,
    /// Our address on this interface.
    pub address: Ipv4Addr,
    /// The directly connected network.
    pub network: Ipv4Net,
}

/// Provenance of an imported (non-learned) route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Operator-installed static route.
    Static,
    /// The default route.
    Default,
    /// Redistributed from another protocol.
    Redistributed,
}

/// A route imported from the host routing table at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRoute {
    /// Destination network.
    pub dest: Ipv4Net,
    /// Next hop, if not directly reachable.
    pub next_hop: Option<Ipv4Addr>,
    /// Egress interface, by name.
    pub iface_name: String,
    /// What kind of route this is.
    pub kind: ImportKind,
    /// Metric to advertise, 1..=16.
    pub metric: u32,
}

/// Actions the driver executes on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RipAction {
    /// Send `packet` to `dest` out of interface `iface`.
    Send {
        /// Destination socket address (unicast or the RIP multicast group).
        dest: SocketAddrV4,
        /// Egress interface id (relevant for multicast destinations).
        iface: u32,
        /// The datagram to send.
        packet: RipPacket,
    },
}

#[derive(Debug, Clone)]
struct RipInterface {
    id: u32,
    name: String,
    address: Ipv4Addr,
    network: Ipv4Net,
    metric: u32,
    split_horizon: SplitHorizonMode,
}

/// Per-router RIP engine.
///
/// Driven by three inputs: [`RipEngine::handle_packet`] for inbound
/// datagrams, [`RipEngine::tick`] for timer expirations, and
/// [`RipEngine::start`] once at boot. `next_wakeup` tells the driver when
/// the next `tick` is worth calling.
#[derive(Debug)]
pub struct RipEngine<I, S> {
    config: RipConfig,
    interfaces: Vec<RipInterface>,
    routes: Vec<RipRoute<I>>,
    next_regular_update_at: Option<I>,
    triggered_update_at: Option<I>,
    bad_responses: u64,
    sink: S,
}

impl<I, S> RipEngine<I, S>
where
    I: Copy + Ord + Send + Sync + Add<Duration, Output = I> + Sub<Output = Duration>,
    S: TelemetrySink,
{
    /// Build an engine from host interfaces, per-interface config, and the
    /// initial route imports (directly connected networks come from the
    /// profiles; static/default routes from `imports`).
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoInterfaces` with an empty profile list
    /// - `ConfigError::DuplicateInterface` on name or id collisions
    /// - `ConfigError::UnknownInterface` if a config or import names an
    ///   interface that does not exist — the instance would be unusable
    /// - `ConfigError::InvalidMetric` for costs outside 1..=16
    pub fn new(
        config: RipConfig,
        profiles: &[InterfaceProfile],
        iface_configs: &[RipInterfaceConfig],
        imports: &[ImportedRoute],
        sink: S,
    ) -> Result<Self, ConfigError> {
        if profiles.is_empty() {
            return Err(ConfigError::NoInterfaces);
        }
        for (i, p) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|q| q.name == p.name || q.id == p.id) {
                return Err(ConfigError::DuplicateInterface { name: p.name.clone() });
            }
        }

        let mut interfaces = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let cfg = iface_configs
                .iter()
                .find(|c| c.name == profile.name)
                .cloned()
                .unwrap_or_else(|| RipInterfaceConfig::new(profile.name.clone()));
            if cfg.metric == 0 || cfg.metric > INFINITE_METRIC {
                return Err(ConfigError::InvalidMetric { metric: cfg.metric });
            }
            interfaces.push(RipInterface {
                id: profile.id,
                name: profile.name.clone(),
                address: profile.address,
                network: profile.network,
                metric: cfg.metric,
                split_horizon: cfg.split_horizon,
            });
        }
        for cfg in iface_configs {
            if !interfaces.iter().any(|i| i.name == cfg.name) {
                return Err(ConfigError::UnknownInterface { name: cfg.name.clone() });
            }
        }

        let mut routes = Vec::new();
        for iface in &interfaces {
            routes.push(RipRoute {
                dest: iface.network,
                next_hop: None,
                iface: iface.id,
                origin: RouteOrigin::Interface,
                metric: 1,
                tag: 0,
                changed: false,
                from: None,
                last_update: None,
                deadlines: None,
            });
        }
        for import in imports {
            let iface = interfaces
                .iter()
                .find(|i| i.name == import.iface_name)
                .ok_or_else(|| ConfigError::UnknownInterface { name: import.iface_name.clone() })?;
            if import.metric == 0 || import.metric > INFINITE_METRIC {
                return Err(ConfigError::InvalidMetric { metric: import.metric });
            }
            let origin = match import.kind {
                ImportKind::Static => RouteOrigin::Static,
                ImportKind::Default => RouteOrigin::Default,
                ImportKind::Redistributed => RouteOrigin::Redistribute,
            };
            routes.push(RipRoute {
                dest: import.dest,
                next_hop: import.next_hop,
                iface: iface.id,
                origin,
                metric: import.metric,
                tag: 0,
                changed: false,
                from: None,
                last_update: None,
                deadlines: None,
            });
        }

        Ok(Self {
            config,
            interfaces,
            routes,
            next_regular_update_at: None,
            triggered_update_at: None,
            bad_responses: 0,
            sink,
        })
    }

    /// Boot the engine: solicit full tables from all neighbors and arm the
    /// regular-update timer with a desynchronizing offset.
    pub fn start<E: Environment>(&mut self, env: &E, now: I) -> Vec<RipAction> {
        let mut actions = Vec::with_capacity(self.interfaces.len());
        for iface in &self.interfaces {
            actions.push(RipAction::Send {
                dest: SocketAddrV4::new(RIP_MULTICAST_GROUP, RIP_UDP_PORT),
                iface: iface.id,
                packet: RipPacket::whole_table_request(),
            });
            self.sink.emit(signals::SENT_REQUESTS, 1.0);
        }

        let offset =
            env.random_delay(self.config.update_interval / 2, self.config.update_interval);
        self.next_regular_update_at = Some(now + offset);
        self.sink.emit(signals::NUM_ROUTES, self.routes.len() as f64);
        debug!(interfaces = self.interfaces.len(), routes = self.routes.len(), "rip started");
        actions
    }

    /// Process one inbound datagram. Malformed or spoofed input is dropped
    /// and counted; nothing here is fatal.
    pub fn handle_packet<E: Environment>(
        &mut self,
        src: SocketAddrV4,
        iface_id: u32,
        packet: &RipPacket,
        env: &E,
        now: I,
    ) -> Vec<RipAction> {
        let Some(iface_idx) = self.interfaces.iter().position(|i| i.id == iface_id) else {
            trace!(iface_id, "datagram on unknown interface dropped");
            return Vec::new();
        };
        match packet.command {
            RipCommand::Request => self.process_request(src, iface_id, packet, now),
            RipCommand::Response => {
                self.process_response(src, iface_idx, packet, env, now);
                Vec::new()
            },
        }
    }

    /// Fire any due timers: route expiry/purge sweep, the regular update,
    /// and a pending triggered update.
    pub fn tick<E: Environment>(&mut self, env: &E, now: I) -> Vec<RipAction> {
        let mut actions = Vec::new();
        self.sweep(env, now);

        if self.next_regular_update_at.is_some_and(|due| now >= due) {
            for idx in 0..self.interfaces.len() {
                let id = self.interfaces[idx].id;
                actions.extend(self.build_response_packets(
                    SocketAddrV4::new(RIP_MULTICAST_GROUP, RIP_UDP_PORT),
                    id,
                    false,
                    now,
                ));
            }
            self.sink.emit(signals::SENT_UPDATES, 1.0);
            self.next_regular_update_at = Some(now + self.config.update_interval);
            // The full table just went to every neighbor; a pending
            // triggered update would be pure duplication.
            self.triggered_update_at = None;
            self.clear_changed_flags();
        }

        if self.triggered_update_at.is_some_and(|due| now >= due) {
            for idx in 0..self.interfaces.len() {
                let id = self.interfaces[idx].id;
                actions.extend(self.build_response_packets(
                    SocketAddrV4::new(RIP_MULTICAST_GROUP, RIP_UDP_PORT),
                    id,
                    true,
                    now,
                ));
            }
            self.sink.emit(signals::SENT_UPDATES, 1.0);
            self.triggered_update_at = None;
            self.clear_changed_flags();
        }

        actions
    }

    /// Earliest instant at which `tick` has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<I> {
        let mut earliest = self.next_regular_update_at;
        let mut fold = |candidate: Option<I>| {
            earliest = match (earliest, candidate) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        };
        fold(self.triggered_update_at);
        for route in &self.routes {
            fold(route.expire_at());
            fold(route.purge_at());
        }
        earliest
    }

    /// Schedule a triggered update after a uniform [1s,5s] holddown.
    /// Idempotent: a pending schedule is left untouched.
    pub fn trigger_update<E: Environment>(&mut self, env: &E, now: I) {
        if self.triggered_update_at.is_none() {
            let delay =
                env.random_delay(self.config.triggered_delay_min, self.config.triggered_delay_max);
            self.triggered_update_at = Some(now + delay);
            trace!(?delay, "triggered update scheduled");
        }
    }

    /// Advertise eligible routes toward `dest` out of `iface_id`, applying
    /// split horizon and splitting across datagrams as needed. When
    /// `changed_only` is set, only changed routes are sent and their
    /// changed flags are reset.
    pub fn send_routes(
        &mut self,
        dest: SocketAddrV4,
        iface_id: u32,
        changed_only: bool,
        now: I,
    ) -> Vec<RipAction> {
        let actions = self.build_response_packets(dest, iface_id, changed_only, now);
        if changed_only {
            self.clear_changed_flags();
        }
        actions
    }

    /// Routes currently in the table.
    #[must_use]
    pub fn routes(&self) -> &[RipRoute<I>] {
        &self.routes
    }

    /// Look up a route by exact destination.
    #[must_use]
    pub fn find_route(&self, dest: Ipv4Net) -> Option<&RipRoute<I>> {
        self.routes.iter().find(|r| r.dest == dest)
    }

    /// Responses rejected by validation so far.
    #[must_use]
    pub fn bad_responses(&self) -> u64 {
        self.bad_responses
    }

    /// Deadline of the pending triggered update, if one is scheduled.
    #[must_use]
    pub fn pending_triggered_update(&self) -> Option<I> {
        self.triggered_update_at
    }

    fn process_request(
        &mut self,
        src: SocketAddrV4,
        iface_id: u32,
        packet: &RipPacket,
        now: I,
    ) -> Vec<RipAction> {
        if packet.is_whole_table_request() {
            return self.send_routes(src, iface_id, false, now);
        }

        // Specific-destination query: echo each entry with our metric, or
        // 16 for destinations we do not know (RFC 2453 §3.9.1).
        let mut entries = Vec::with_capacity(packet.entries.len());
        for entry in &packet.entries {
            if entry.address_family() != AF_INET {
                continue;
            }
            let Ok(dest) = entry.destination() else {
                continue;
            };
            let mut echoed = *entry;
            match self.routes.iter().find(|r| r.dest == dest) {
                Some(route) if route.health(now) == RouteHealth::Valid => {
                    echoed.set_metric(route.metric);
                    echoed.set_route_tag(route.tag);
                },
                _ => echoed.set_metric(INFINITE_METRIC),
            }
            entries.push(echoed);
        }
        if entries.is_empty() {
            return Vec::new();
        }
        vec![RipAction::Send {
            dest: src,
            iface: iface_id,
            packet: RipPacket::new(RipCommand::Response, entries),
        }]
    }

    fn process_response<E: Environment>(
        &mut self,
        src: SocketAddrV4,
        iface_idx: usize,
        packet: &RipPacket,
        env: &E,
        now: I,
    ) {
        if !self.is_valid_response(src, iface_idx, packet) {
            self.bad_responses += 1;
            self.sink.emit(signals::BAD_RESPONSES, 1.0);
            return;
        }
        self.sink.emit(signals::RCVD_RESPONSES, 1.0);

        let iface_id = self.interfaces[iface_idx].id;
        let iface_metric = self.interfaces[iface_idx].metric;
        let iface_network = self.interfaces[iface_idx].network;
        let src_ip = *src.ip();

        for entry in &packet.entries {
            if entry.address_family() != AF_INET {
                continue;
            }
            let Ok(dest) = entry.destination() else {
                trace!(address = %entry.address(), "entry with bad netmask skipped");
                continue;
            };
            if self.is_own_address(entry.address()) {
                continue;
            }

            let metric = (entry.metric() + iface_metric).min(INFINITE_METRIC);
            let advertised_hop = entry.next_hop();
            let next_hop = if !advertised_hop.is_unspecified() && iface_network.contains(advertised_hop)
            {
                advertised_hop
            } else {
                src_ip
            };

            match self.routes.iter().position(|r| r.dest == dest) {
                Some(idx) => {
                    self.consider_update(
                        idx,
                        dest,
                        iface_id,
                        next_hop,
                        metric,
                        src_ip,
                        entry.route_tag(),
                        env,
                        now,
                    );
                },
                None if metric < INFINITE_METRIC => {
                    self.add_route(dest, iface_id, next_hop, metric, src_ip, entry.route_tag(), env, now);
                },
                None => {},
            }
        }
    }

    /// Accept a response only from a neighbor's RIP socket: source port
    /// 520, source directly connected on the arrival interface, not one of
    /// our own addresses, and every advertised metric in 1..=16.
    fn is_valid_response(&self, src: SocketAddrV4, iface_idx: usize, packet: &RipPacket) -> bool {
        if src.port() != RIP_UDP_PORT {
            return false;
        }
        if self.is_own_address(*src.ip()) {
            return false;
        }
        if !self.interfaces[iface_idx].network.contains(*src.ip()) {
            return false;
        }
        packet
            .entries
            .iter()
            .all(|e| e.metric() >= 1 && e.metric() <= INFINITE_METRIC)
    }

    #[allow(clippy::too_many_arguments)]
    fn consider_update<E: Environment>(
        &mut self,
        idx: usize,
        dest: Ipv4Net,
        iface_id: u32,
        next_hop: Ipv4Addr,
        metric: u32,
        from: Ipv4Addr,
        tag: u16,
        env: &E,
        now: I,
    ) {
        // A route past its purge deadline no longer exists as far as the
        // protocol is concerned: drop it and treat this as a fresh learn.
        if self.routes[idx].health(now) == RouteHealth::Purged {
            self.purge_route(idx);
            if metric < INFINITE_METRIC {
                self.add_route(dest, iface_id, next_hop, metric, from, tag, env, now);
            }
            return;
        }
        // Operator-installed and connected routes outrank anything learned.
        if self.routes[idx].origin.is_zero_touch() {
            return;
        }

        let from_same = self.routes[idx].from == Some(from);
        if from_same {
            if metric != self.routes[idx].metric {
                self.update_route(idx, iface_id, next_hop, metric, from, tag, env, now);
            } else if metric < INFINITE_METRIC {
                self.refresh_route(idx, now);
            }
        } else if metric < self.routes[idx].metric {
            self.update_route(idx, iface_id, next_hop, metric, from, tag, env, now);
        } else if metric == self.routes[idx].metric
            && metric < INFINITE_METRIC
            && self.past_half_expiry(idx, now)
        {
            // Equal-cost route from a fresher neighbor while the incumbent
            // is aging out (RFC 2453 §3.9.2).
            self.update_route(idx, iface_id, next_hop, metric, from, tag, env, now);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_route<E: Environment>(
        &mut self,
        dest: Ipv4Net,
        iface_id: u32,
        next_hop: Ipv4Addr,
        metric: u32,
        from: Ipv4Addr,
        tag: u16,
        env: &E,
        now: I,
    ) {
        debug_assert!(metric < INFINITE_METRIC);
        let expire_at = now + self.config.route_expiry;
        self.routes.push(RipRoute {
            dest,
            next_hop: Some(next_hop),
            iface: iface_id,
            origin: RouteOrigin::Rte,
            metric,
            tag,
            changed: true,
            from: Some(from),
            last_update: Some(now),
            deadlines: Some(Deadlines { expire_at, purge_at: expire_at + self.config.route_purge }),
        });
        debug!(%dest, metric, next_hop = %next_hop, "route learned");
        self.sink.emit(signals::NUM_ROUTES, self.routes.len() as f64);
        self.trigger_update(env, now);
    }

    /// Apply a learned update. Metric 16 invalidates rather than deletes;
    /// anything else rewrites the route and restarts its lifetime.
    #[allow(clippy::too_many_arguments)]
    fn update_route<E: Environment>(
        &mut self,
        idx: usize,
        iface_id: u32,
        next_hop: Ipv4Addr,
        metric: u32,
        from: Ipv4Addr,
        tag: u16,
        env: &E,
        now: I,
    ) {
        debug_assert!(metric <= INFINITE_METRIC);
        if metric == INFINITE_METRIC {
            if self.routes[idx].metric < INFINITE_METRIC {
                self.invalidate_route(idx, env, now);
            }
            return;
        }

        let expire_at = now + self.config.route_expiry;
        let route = &mut self.routes[idx];
        route.iface = iface_id;
        route.next_hop = Some(next_hop);
        route.metric = metric;
        route.from = Some(from);
        route.tag = tag;
        route.changed = true;
        route.last_update = Some(now);
        route.deadlines =
            Some(Deadlines { expire_at, purge_at: expire_at + self.config.route_purge });
        debug!(dest = %route.dest, metric, "route updated");
        self.trigger_update(env, now);
    }

    /// Same-neighbor, same-metric update: just restart the lifetime.
    fn refresh_route(&mut self, idx: usize, now: I) {
        let expire_at = now + self.config.route_expiry;
        let route = &mut self.routes[idx];
        route.last_update = Some(now);
        route.deadlines =
            Some(Deadlines { expire_at, purge_at: expire_at + self.config.route_purge });
    }

    /// Mark a route unreachable but keep it advertisable until its purge
    /// deadline so neighbors hear about the breakage.
    fn invalidate_route<E: Environment>(&mut self, idx: usize, env: &E, now: I) {
        let purge = self.config.route_purge;
        let route = &mut self.routes[idx];
        route.metric = INFINITE_METRIC;
        route.changed = true;
        let purge_at = match route.deadlines {
            // Natural expiry keeps purge == expiry + purge interval;
            // explicit invalidation starts the countdown now.
            Some(d) => d.purge_at.min(now + purge),
            None => now + purge,
        };
        let expire_at = match route.deadlines {
            Some(d) => d.expire_at.min(now),
            None => now,
        };
        route.deadlines = Some(Deadlines { expire_at, purge_at });
        debug!(dest = %route.dest, "route invalidated");
        self.trigger_update(env, now);
    }

    fn purge_route(&mut self, idx: usize) {
        let route = self.routes.swap_remove(idx);
        debug!(dest = %route.dest, "route purged");
        self.sink.emit(signals::NUM_ROUTES, self.routes.len() as f64);
    }

    /// Lazy lifecycle pass: expire overdue routes, remove purgeable ones.
    fn sweep<E: Environment>(&mut self, env: &E, now: I) {
        for idx in 0..self.routes.len() {
            if self.routes[idx].health(now) == RouteHealth::Expired
                && self.routes[idx].metric < INFINITE_METRIC
            {
                self.invalidate_route(idx, env, now);
            }
        }
        let before = self.routes.len();
        self.routes.retain(|r| r.health(now) != RouteHealth::Purged);
        if self.routes.len() != before {
            self.sink.emit(signals::NUM_ROUTES, self.routes.len() as f64);
        }
    }

    fn past_half_expiry(&self, idx: usize, now: I) -> bool {
        match self.routes[idx].last_update {
            Some(last) => now - last >= self.config.route_expiry / 2,
            None => false,
        }
    }

    fn is_own_address(&self, addr: Ipv4Addr) -> bool {
        self.interfaces.iter().any(|i| i.address == addr)
    }

    fn clear_changed_flags(&mut self) {
        for route in &mut self.routes {
            route.changed = false;
        }
    }

    /// Build advertisement packets without touching any flags.
    fn build_response_packets(
        &self,
        dest: SocketAddrV4,
        iface_id: u32,
        changed_only: bool,
        now: I,
    ) -> Vec<RipAction> {
        let Some(iface) = self.interfaces.iter().find(|i| i.id == iface_id) else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        for route in &self.routes {
            let health = route.health(now);
            if health == RouteHealth::Purged {
                continue;
            }
            if changed_only && !route.changed {
                continue;
            }
            let mut metric =
                if health == RouteHealth::Expired { INFINITE_METRIC } else { route.metric };
            if route.iface == iface_id {
                match iface.split_horizon {
                    SplitHorizonMode::Plain => continue,
                    SplitHorizonMode::PoisonedReverse => metric = INFINITE_METRIC,
                    SplitHorizonMode::Disabled => {},
                }
            }
            let mut entry = RipEntry::new(route.dest, metric);
            entry.set_route_tag(route.tag);
            entries.push(entry);
        }

        entries
            .chunks(MAX_ENTRIES_PER_PACKET)
            .map(|chunk| RipAction::Send {
                dest,
                iface: iface_id,
                packet: RipPacket::new(RipCommand::Response, chunk.to_vec()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NullSink;

    /// Virtual instant for deterministic tests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct T(Duration);

    impl Add<Duration> for T {
        type Output = T;
        fn add(self, rhs: Duration) -> T {
            T(self.0 + rhs)
        }
    }

    impl Sub for T {
        type Output = Duration;
        fn sub(self, rhs: T) -> Duration {
            self.0 - rhs.0
        }
    }

    fn t(secs: u64) -> T {
        T(Duration::from_secs(secs))
    }

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = T;

        fn now(&self) -> T {
            t(0)
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            // Deterministic for tests
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    fn net(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> Ipv4Net {
        Ipv4Net::new(Ipv4Addr::new(a, b, c, d), prefix).unwrap()
    }

    fn eth0_profile() -> InterfaceProfile {
        InterfaceProfile {
            id: 1,
            name: "eth0".to_string(),
            address: Ipv4Addr::new(192, 168, 0, 1),
            network: net(192, 168, 0, 0, 24),
        }
    }

    fn engine_with(mode: SplitHorizonMode) -> RipEngine<T, NullSink> {
        let cfg = RipInterfaceConfig { name: "eth0".to_string(), metric: 1, split_horizon: mode };
        RipEngine::new(RipConfig::default(), &[eth0_profile()], &[cfg], &[], NullSink).unwrap()
    }

    fn neighbor() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 2), RIP_UDP_PORT)
    }

    fn response(dest: Ipv4Net, metric: u32) -> RipPacket {
        RipPacket::new(RipCommand::Response, vec![RipEntry::new(dest, metric)])
    }

    #[test]
    fn learn_route_from_neighbor() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));

        let route = engine.find_route(dest).expect("route learned");
        assert_eq!(route.metric, 2); // advertised 1 + interface cost 1
        assert_eq!(route.next_hop, Some(*neighbor().ip()));
        assert_eq!(route.from, Some(*neighbor().ip()));
        assert!(route.changed);
        assert_eq!(route.expire_at(), Some(t(180)));
        assert_eq!(route.purge_at(), Some(t(300)));
        assert!(engine.pending_triggered_update().is_some());
    }

    #[test]
    fn infinite_metric_invalidates_then_purges() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));
        engine.handle_packet(neighbor(), 1, &response(dest, INFINITE_METRIC), &env, t(10));

        // Invalidated, not deleted
        let route = engine.find_route(dest).expect("route retained");
        assert_eq!(route.metric, INFINITE_METRIC);
        assert!(route.changed);
        assert_eq!(route.purge_at(), Some(t(130))); // invalidation + 120s

        // Not yet purged just before the deadline
        engine.tick(&env, t(129));
        assert!(engine.find_route(dest).is_some());

        // Gone after the purge deadline with no intervening update
        engine.tick(&env, t(130));
        assert!(engine.find_route(dest).is_none());
    }

    #[test]
    fn natural_expiry_sets_infinite_metric_and_purges_after_120s() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));
        engine.tick(&env, t(179));
        assert_eq!(engine.find_route(dest).unwrap().metric, 2);

        engine.tick(&env, t(180));
        let route = engine.find_route(dest).expect("expired route retained");
        assert_eq!(route.metric, INFINITE_METRIC);
        assert_eq!(route.purge_at(), Some(t(300))); // expiry + 120s

        engine.tick(&env, t(300));
        assert!(engine.find_route(dest).is_none());
    }

    #[test]
    fn refresh_from_same_neighbor_extends_expiry() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));
        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(100));

        let route = engine.find_route(dest).unwrap();
        assert_eq!(route.expire_at(), Some(t(280)));
        assert_eq!(route.purge_at(), Some(t(400)));
    }

    #[test]
    fn worse_metric_from_other_neighbor_ignored_until_half_expiry() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);
        let other = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 3), RIP_UDP_PORT);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));

        // Equal metric, fresh incumbent: keep the incumbent
        engine.handle_packet(other, 1, &response(dest, 1), &env, t(10));
        assert_eq!(engine.find_route(dest).unwrap().from, Some(*neighbor().ip()));

        // Equal metric, incumbent past half expiry: switch
        engine.handle_packet(other, 1, &response(dest, 1), &env, t(91));
        assert_eq!(engine.find_route(dest).unwrap().from, Some(*other.ip()));
    }

    #[test]
    fn triggered_update_is_idempotent() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);

        engine.trigger_update(&env, t(0));
        let first = engine.pending_triggered_update().expect("scheduled");
        engine.trigger_update(&env, t(0));
        assert_eq!(engine.pending_triggered_update(), Some(first));
    }

    #[test]
    fn poisoned_reverse_advertises_metric_16_toward_learn_source() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::PoisonedReverse);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));

        let actions = engine.send_routes(neighbor(), 1, false, t(1));
        let RipAction::Send { packet, .. } = &actions[0];
        let poisoned = packet.entries.iter().find(|e| e.address() == dest.address).unwrap();
        assert_eq!(poisoned.metric(), INFINITE_METRIC);
    }

    #[test]
    fn plain_split_horizon_suppresses_toward_learn_source() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));

        let actions = engine.send_routes(neighbor(), 1, false, t(1));
        // The learned route and the connected route both live on eth0, so
        // nothing at all goes back out of it.
        assert!(actions.is_empty());
    }

    #[test]
    fn changed_only_round_resets_flags() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Disabled);
        let dest = net(10, 0, 0, 0, 24);

        engine.handle_packet(neighbor(), 1, &response(dest, 1), &env, t(0));
        assert!(engine.find_route(dest).unwrap().changed);

        let actions = engine.send_routes(neighbor(), 1, true, t(1));
        assert_eq!(actions.len(), 1);
        assert!(!engine.find_route(dest).unwrap().changed);

        // Nothing changed since: a second changed-only round is empty
        assert!(engine.send_routes(neighbor(), 1, true, t(2)).is_empty());
    }

    #[test]
    fn bad_responses_are_counted_and_ignored() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);
        let dest = net(10, 0, 0, 0, 24);

        // Wrong source port
        let ephemeral = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 2), 12345);
        engine.handle_packet(ephemeral, 1, &response(dest, 1), &env, t(0));

        // Source not on the arrival interface's network
        let off_link = SocketAddrV4::new(Ipv4Addr::new(172, 16, 0, 1), RIP_UDP_PORT);
        engine.handle_packet(off_link, 1, &response(dest, 1), &env, t(0));

        // Metric out of range
        engine.handle_packet(neighbor(), 1, &response(dest, 17), &env, t(0));

        assert_eq!(engine.bad_responses(), 3);
        assert!(engine.find_route(dest).is_none());
    }

    #[test]
    fn whole_table_request_gets_full_response() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Disabled);
        engine.handle_packet(neighbor(), 1, &response(net(10, 0, 0, 0, 24), 1), &env, t(0));

        let requester = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 7), RIP_UDP_PORT);
        let actions =
            engine.handle_packet(requester, 1, &RipPacket::whole_table_request(), &env, t(1));

        let RipAction::Send { dest, packet, .. } = &actions[0];
        assert_eq!(*dest, requester);
        assert_eq!(packet.command, RipCommand::Response);
        assert_eq!(packet.entries.len(), 2); // connected + learned
    }

    #[test]
    fn specific_request_answers_unknown_with_infinite_metric() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);

        let query = RipPacket::new(
            RipCommand::Request,
            vec![RipEntry::new(net(172, 16, 0, 0, 16), 1)],
        );
        let actions = engine.handle_packet(neighbor(), 1, &query, &env, t(0));

        let RipAction::Send { packet, .. } = &actions[0];
        assert_eq!(packet.entries[0].metric(), INFINITE_METRIC);
    }

    #[test]
    fn regular_update_fires_and_reschedules() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Disabled);

        let boot = engine.start(&env, t(0));
        assert_eq!(boot.len(), 1);
        let RipAction::Send { packet, .. } = &boot[0];
        assert!(packet.is_whole_table_request());

        let due = engine.next_wakeup().expect("regular update armed");
        assert!(engine.tick(&env, due).iter().all(|RipAction::Send { packet, .. }| {
            packet.command == RipCommand::Response
        }));

        // Rescheduled one interval later
        assert_eq!(engine.next_wakeup(), Some(due + RipConfig::default().update_interval));
    }

    #[test]
    fn unknown_interface_in_import_is_fatal() {
        let import = ImportedRoute {
            dest: net(10, 9, 0, 0, 16),
            next_hop: Some(Ipv4Addr::new(192, 168, 0, 254)),
            iface_name: "eth7".to_string(),
            kind: ImportKind::Static,
            metric: 1,
        };
        let err = RipEngine::<T, _>::new(
            RipConfig::default(),
            &[eth0_profile()],
            &[],
            &[import],
            NullSink,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownInterface { name: "eth7".to_string() });
    }

    #[test]
    fn zero_touch_routes_resist_peer_updates() {
        let env = TestEnv;
        let mut engine = engine_with(SplitHorizonMode::Plain);

        // Try to hijack the connected network with a "better" advertisement
        engine.handle_packet(neighbor(), 1, &response(net(192, 168, 0, 0, 24), 1), &env, t(0));

        let route = engine.find_route(net(192, 168, 0, 0, 24)).unwrap();
        assert_eq!(route.origin, RouteOrigin::Interface);
        assert_eq!(route.next_hop, None);
    }
}
