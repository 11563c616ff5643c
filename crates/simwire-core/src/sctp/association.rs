//! Per-association ASCONF/authentication state machine.

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::{Add, Sub},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use simwire_proto::{
    AckResponse, AsconfAckChunk, AsconfChunk, AsconfParam, AsconfParamKind, AuthChunk, Chunk,
    SctpPacket,
    sctp::{CAUSE_DELETE_LAST_ADDRESS, CAUSE_DELETE_SOURCE_ADDRESS, CAUSE_UNRESOLVABLE_ADDRESS,
        CHUNK_AUTH},
};
use tracing::{debug, trace, warn};

use super::keys::calculate_assoc_shared_key;
use crate::error::ConfigError;

/// Actions the driver executes on the association's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SctpAction {
    /// Send `packet` toward `dest`.
    Send {
        /// Destination address (one of the peer's addresses).
        dest: IpAddr,
        /// The packet to send.
        packet: SctpPacket,
    },
}

/// Static configuration of one association, loaded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Our addresses; the first entry is the primary source.
    pub local_addresses: Vec<IpAddr>,
    /// The peer's addresses; the first entry is the primary path.
    pub remote_addresses: Vec<IpAddr>,
    /// Our port.
    pub local_port: u16,
    /// The peer's port.
    pub remote_port: u16,
    /// Verification tag the peer stamps on packets to us.
    pub local_vtag: u32,
    /// Verification tag we stamp on packets to the peer.
    pub peer_vtag: u32,
    /// Substitute the wildcard address when we sit behind a NAT.
    pub nat_friendly: bool,
    /// Whether we authenticate chunks.
    pub auth_enabled: bool,
    /// Address used by subsequent add/delete/set-primary requests.
    pub pending_address: Option<IpAddr>,
    /// Initial retransmission timeout.
    pub rto_initial: Duration,
    /// Upper bound on the backed-off retransmission timeout.
    pub rto_max: Duration,
    /// Our random key vector from association setup.
    pub key_vector: Vec<u8>,
    /// The peer's random key vector from association setup.
    pub peer_key_vector: Vec<u8>,
    /// Chunk types the peer advertised support for.
    pub peer_chunk_types: Vec<u8>,
}

impl AssociationConfig {
    /// Config with protocol-default timers and everything optional off.
    #[must_use]
    pub fn new(local_addresses: Vec<IpAddr>, remote_addresses: Vec<IpAddr>) -> Self {
        Self {
            local_addresses,
            remote_addresses,
            local_port: 0,
            remote_port: 0,
            local_vtag: 0,
            peer_vtag: 0,
            nat_friendly: false,
            auth_enabled: false,
            pending_address: None,
            rto_initial: Duration::from_secs(3),
            rto_max: Duration::from_secs(60),
            key_vector: Vec::new(),
            peer_key_vector: Vec::new(),
            peer_chunk_types: Vec::new(),
        }
    }
}

/// Routing scope of an address, used to detect the NAT-friendly case:
/// a private local endpoint talking to a globally scoped peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddrScope {
    Loopback,
    LinkLocal,
    Private,
    Global,
}

fn scope_of(addr: IpAddr) -> AddrScope {
    match addr {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                AddrScope::Loopback
            } else if v4.is_link_local() {
                AddrScope::LinkLocal
            } else if v4.is_private() {
                AddrScope::Private
            } else {
                AddrScope::Global
            }
        },
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                AddrScope::Loopback
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                AddrScope::LinkLocal
            } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
                AddrScope::Private
            } else {
                AddrScope::Global
            }
        },
    }
}

fn wildcard_like(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

/// One SCTP association's address-management and authentication state.
///
/// Generic over the instant type so production and virtual clocks both
/// work; time only ever arrives as a method parameter.
#[derive(Debug, Clone)]
pub struct Association<I> {
    local_addresses: Vec<IpAddr>,
    remote_addresses: Vec<IpAddr>,
    primary_path: IpAddr,
    local_port: u16,
    remote_port: u16,
    local_vtag: u32,
    peer_vtag: u32,
    nat_friendly: bool,
    auth_enabled: bool,
    pending_address: Option<IpAddr>,
    shared_key: Vec<u8>,
    peer_chunk_types: Vec<u8>,

    /// Serial number the next (or currently outstanding) ASCONF carries.
    asconf_serial: u32,
    /// Correlation-id counter; strictly increasing over the association.
    correlation_counter: u32,
    /// Mutual exclusion flag: at most one ASCONF in flight.
    asconf_outstanding: bool,
    /// Immutable snapshot of the last sent ASCONF, for retransmission.
    retained_asconf: Option<AsconfChunk>,
    rtx_deadline: Option<I>,
    rto: Duration,
    rto_initial: Duration,
    rto_max: Duration,

    /// Highest ASCONF serial we have processed from the peer.
    last_recv_serial: Option<u32>,
    /// ACK for `last_recv_serial`, replayed on duplicate serials.
    cached_ack: Option<AsconfAckChunk>,
}

impl<I> Association<I>
where
    I: Copy + Ord + Send + Sync + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Build an association from its configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::EmptyAddressList` if either endpoint has no
    ///   addresses
    /// - `ConfigError::EmptyKeyVector` if authentication is enabled
    ///   without key material on either side
    pub fn new(config: AssociationConfig) -> Result<Self, ConfigError> {
        if config.local_addresses.is_empty() {
            return Err(ConfigError::EmptyAddressList { side: "local" });
        }
        if config.remote_addresses.is_empty() {
            return Err(ConfigError::EmptyAddressList { side: "remote" });
        }
        if config.auth_enabled && config.key_vector.is_empty() {
            return Err(ConfigError::EmptyKeyVector { side: "local" });
        }
        if config.auth_enabled && config.peer_key_vector.is_empty() {
            return Err(ConfigError::EmptyKeyVector { side: "peer" });
        }

        let shared_key = if config.auth_enabled {
            calculate_assoc_shared_key(&config.key_vector, &config.peer_key_vector)
        } else {
            Vec::new()
        };
        let primary_path = config.remote_addresses[0];

        Ok(Self {
            local_addresses: config.local_addresses,
            remote_addresses: config.remote_addresses,
            primary_path,
            local_port: config.local_port,
            remote_port: config.remote_port,
            local_vtag: config.local_vtag,
            peer_vtag: config.peer_vtag,
            nat_friendly: config.nat_friendly,
            auth_enabled: config.auth_enabled,
            pending_address: config.pending_address,
            shared_key,
            peer_chunk_types: config.peer_chunk_types,
            asconf_serial: 0,
            correlation_counter: 0,
            asconf_outstanding: false,
            retained_asconf: None,
            rtx_deadline: None,
            rto: config.rto_initial,
            rto_initial: config.rto_initial,
            rto_max: config.rto_max,
            last_recv_serial: None,
            cached_ack: None,
        })
    }

    /// Build and send one ASCONF chunk carrying one parameter per
    /// requested change, each tagged with a fresh correlation id.
    ///
    /// No-op while an ASCONF is already outstanding: the at-most-one-in-
    /// flight invariant permits only retransmission until the ACK arrives.
    ///
    /// On the NAT-friendly path (private local scope, global peer scope)
    /// the wildcard address is substituted and the peer's verification tag
    /// embedded; unless `remote` is set, the request then travels over the
    /// alternate path so the NAT binding for the new address is created.
    pub fn send_asconf(
        &mut self,
        changes: &[AsconfParamKind],
        remote: bool,
        now: I,
    ) -> Vec<SctpAction> {
        if self.asconf_outstanding {
            debug!("asconf outstanding; new request suppressed");
            return Vec::new();
        }
        if changes.is_empty() {
            return Vec::new();
        }
        let Some(pending) = self.pending_address else {
            warn!("no pending address configured; asconf not sent");
            return Vec::new();
        };

        let nat = self.nat_friendly
            && scope_of(self.local_primary()) == AddrScope::Private
            && scope_of(self.primary_path) == AddrScope::Global;

        let chunk_address =
            if nat { wildcard_like(self.local_primary()) } else { self.local_primary() };

        let mut params = Vec::with_capacity(changes.len());
        for &kind in changes {
            self.correlation_counter = self.correlation_counter.wrapping_add(1);
            let address = match kind {
                AsconfParamKind::AddIp | AsconfParamKind::SetPrimary if nat => {
                    wildcard_like(pending)
                },
                _ => pending,
            };
            if kind == AsconfParamKind::AddIp && !self.local_addresses.contains(&pending) {
                // Applied optimistically; rolled back if the peer refuses.
                self.local_addresses.push(pending);
            }
            params.push(AsconfParam { kind, correlation_id: self.correlation_counter, address });
        }

        let chunk = AsconfChunk {
            serial_number: self.asconf_serial,
            address: chunk_address,
            peer_vtag: nat.then_some(self.peer_vtag),
            params,
        };

        let dest = if nat && !remote { self.alternate_remote() } else { self.primary_path };
        let packet = self.packetize(Chunk::Asconf(chunk.clone()));

        self.retained_asconf = Some(chunk);
        self.asconf_outstanding = true;
        self.rto = self.rto_initial;
        self.rtx_deadline = Some(now + self.rto);
        debug!(serial = self.asconf_serial, nat, %dest, "asconf sent");

        vec![SctpAction::Send { dest, packet }]
    }

    /// Re-send the retained ASCONF verbatim — same serial, same
    /// correlation ids — and back off the retransmission timer.
    pub fn retransmit_asconf(&mut self, now: I) -> Vec<SctpAction> {
        let Some(chunk) = self.retained_asconf.clone() else {
            return Vec::new();
        };
        self.rto = (self.rto * 2).min(self.rto_max);
        self.rtx_deadline = Some(now + self.rto);
        debug!(serial = chunk.serial_number, rto = ?self.rto, "asconf retransmitted");

        vec![SctpAction::Send {
            dest: self.primary_path,
            packet: self.packetize(Chunk::Asconf(chunk)),
        }]
    }

    /// Fire the retransmission timer if it is due.
    pub fn tick(&mut self, now: I) -> Vec<SctpAction> {
        if self.asconf_outstanding && self.rtx_deadline.is_some_and(|due| now >= due) {
            return self.retransmit_asconf(now);
        }
        Vec::new()
    }

    /// Earliest instant at which `tick` has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<I> {
        if self.asconf_outstanding { self.rtx_deadline } else { None }
    }

    /// Process one inbound packet. Anything that fails validation is
    /// ignored without a reply; the sender's timer handles recovery.
    pub fn handle_packet(&mut self, src: IpAddr, packet: &SctpPacket) -> Vec<SctpAction> {
        if packet.verification_tag != self.local_vtag {
            trace!(tag = packet.verification_tag, "verification tag mismatch; packet dropped");
            return Vec::new();
        }
        if self.mutual_auth() && !packet.has_auth() {
            trace!("unauthenticated packet ignored");
            return Vec::new();
        }

        let mut actions = Vec::new();
        for chunk in &packet.chunks {
            match chunk {
                Chunk::Asconf(c) => actions.extend(self.handle_asconf(src, c)),
                Chunk::AsconfAck(c) => self.handle_asconf_ack(c),
                // Digest verification happens below this layer.
                Chunk::Auth(_) => {},
            }
        }
        actions
    }

    /// Acknowledge `serial_number` with a bare ACK toward `dest`.
    pub fn send_asconf_ack(&mut self, serial_number: u32, dest: IpAddr) -> Vec<SctpAction> {
        let ack = Self::create_asconf_ack_chunk(serial_number);
        vec![SctpAction::Send { dest, packet: self.packetize(Chunk::AsconfAck(ack)) }]
    }

    /// An ACK chunk echoing `serial_number`, with no indications yet.
    #[must_use]
    pub fn create_asconf_ack_chunk(serial_number: u32) -> AsconfAckChunk {
        AsconfAckChunk { serial_number, responses: Vec::new() }
    }

    /// A success indication echoing `correlation_id`.
    #[must_use]
    pub fn create_success_indication(correlation_id: u32) -> AckResponse {
        AckResponse::Success { correlation_id }
    }

    /// The AUTH framing for outbound packets: key index 0, the configured
    /// HMAC suite, and a zeroed digest the lower layer fills in.
    #[must_use]
    pub fn create_auth_chunk(&self) -> AuthChunk {
        AuthChunk::zeroed()
    }

    /// True if the peer advertised support for `chunk_type`.
    #[must_use]
    pub fn peer_supports(&self, chunk_type: u8) -> bool {
        self.peer_chunk_types.contains(&chunk_type)
    }

    /// True when both sides authenticate: we have it enabled and the peer
    /// advertised the AUTH chunk.
    #[must_use]
    pub fn mutual_auth(&self) -> bool {
        self.auth_enabled && self.peer_supports(CHUNK_AUTH)
    }

    /// Whether an ASCONF is currently in flight.
    #[must_use]
    pub fn asconf_outstanding(&self) -> bool {
        self.asconf_outstanding
    }

    /// Serial number of the next (or in-flight) ASCONF.
    #[must_use]
    pub fn current_serial(&self) -> u32 {
        self.asconf_serial
    }

    /// The retained last-sent ASCONF snapshot, if one is outstanding.
    #[must_use]
    pub fn last_sent_asconf(&self) -> Option<&AsconfChunk> {
        self.retained_asconf.as_ref()
    }

    /// Our addresses, primary first.
    #[must_use]
    pub fn local_addresses(&self) -> &[IpAddr] {
        &self.local_addresses
    }

    /// The peer's addresses as we currently know them.
    #[must_use]
    pub fn remote_addresses(&self) -> &[IpAddr] {
        &self.remote_addresses
    }

    /// The peer address we currently send to.
    #[must_use]
    pub fn primary_path(&self) -> IpAddr {
        self.primary_path
    }

    /// The derived association shared key (empty without authentication).
    #[must_use]
    pub fn shared_key(&self) -> &[u8] {
        &self.shared_key
    }

    fn handle_asconf(&mut self, src: IpAddr, chunk: &AsconfChunk) -> Vec<SctpAction> {
        // Duplicate of the last processed request: replay the cached ACK
        // without reapplying anything.
        if self.last_recv_serial == Some(chunk.serial_number) {
            if let Some(ack) = self.cached_ack.clone() {
                trace!(serial = chunk.serial_number, "duplicate asconf; ack replayed");
                return vec![SctpAction::Send {
                    dest: src,
                    packet: self.packetize(Chunk::AsconfAck(ack)),
                }];
            }
            return Vec::new();
        }
        if let Some(last) = self.last_recv_serial {
            if chunk.serial_number != last.wrapping_add(1) {
                trace!(serial = chunk.serial_number, "asconf serial out of window; ignored");
                return Vec::new();
            }
        }

        let mut ack = Self::create_asconf_ack_chunk(chunk.serial_number);
        for param in &chunk.params {
            let addr = if param.address.is_unspecified() { src } else { param.address };
            let response = match param.kind {
                AsconfParamKind::AddIp => {
                    if !self.remote_addresses.contains(&addr) {
                        self.remote_addresses.push(addr);
                        debug!(%addr, "peer address added");
                    }
                    Self::create_success_indication(param.correlation_id)
                },
                AsconfParamKind::DeleteIp => {
                    if self.remote_addresses.len() <= 1 {
                        AckResponse::Error {
                            correlation_id: param.correlation_id,
                            cause: CAUSE_DELETE_LAST_ADDRESS,
                        }
                    } else if addr == src {
                        AckResponse::Error {
                            correlation_id: param.correlation_id,
                            cause: CAUSE_DELETE_SOURCE_ADDRESS,
                        }
                    } else if let Some(pos) =
                        self.remote_addresses.iter().position(|a| *a == addr)
                    {
                        self.remote_addresses.remove(pos);
                        if self.primary_path == addr {
                            self.primary_path = self.remote_addresses[0];
                        }
                        debug!(%addr, "peer address deleted");
                        Self::create_success_indication(param.correlation_id)
                    } else {
                        AckResponse::Error {
                            correlation_id: param.correlation_id,
                            cause: CAUSE_UNRESOLVABLE_ADDRESS,
                        }
                    }
                },
                AsconfParamKind::SetPrimary => {
                    if self.remote_addresses.contains(&addr) {
                        self.primary_path = addr;
                        debug!(%addr, "primary path switched");
                        Self::create_success_indication(param.correlation_id)
                    } else {
                        AckResponse::Error {
                            correlation_id: param.correlation_id,
                            cause: CAUSE_UNRESOLVABLE_ADDRESS,
                        }
                    }
                },
            };
            ack.responses.push(response);
        }

        self.last_recv_serial = Some(chunk.serial_number);
        self.cached_ack = Some(ack.clone());
        vec![SctpAction::Send { dest: src, packet: self.packetize(Chunk::AsconfAck(ack)) }]
    }

    fn handle_asconf_ack(&mut self, chunk: &AsconfAckChunk) {
        if !self.asconf_outstanding {
            trace!(serial = chunk.serial_number, "asconf-ack with nothing outstanding; ignored");
            return;
        }
        if chunk.serial_number != self.asconf_serial {
            trace!(serial = chunk.serial_number, "asconf-ack for unknown serial; ignored");
            return;
        }

        let retained = self.retained_asconf.take();
        self.asconf_outstanding = false;
        self.rtx_deadline = None;
        self.rto = self.rto_initial;
        self.asconf_serial = self.asconf_serial.wrapping_add(1);
        debug!(serial = chunk.serial_number, "asconf acknowledged");

        let Some(request) = retained else { return };
        for param in &request.params {
            let accepted = ack_accepts(chunk, param.correlation_id);
            let target = if param.address.is_unspecified() {
                self.pending_address
            } else {
                Some(param.address)
            };
            let Some(target) = target else { continue };
            match param.kind {
                // Optimistic add refused by the peer: roll it back.
                AsconfParamKind::AddIp if !accepted => {
                    if self.local_addresses.len() > 1 {
                        self.local_addresses.retain(|a| *a != target);
                    }
                },
                // Deletes are deferred until the peer confirms.
                AsconfParamKind::DeleteIp if accepted => {
                    if self.local_addresses.len() > 1 {
                        self.local_addresses.retain(|a| *a != target);
                    }
                },
                _ => {},
            }
        }
    }

    fn packetize(&self, chunk: Chunk) -> SctpPacket {
        let mut chunks = Vec::with_capacity(2);
        if self.mutual_auth() {
            chunks.push(Chunk::Auth(self.create_auth_chunk()));
        }
        chunks.push(chunk);
        SctpPacket::new(self.local_port, self.remote_port, self.peer_vtag, chunks)
    }

    fn local_primary(&self) -> IpAddr {
        // INVARIANT: the constructor rejects empty address lists and
        // deletions never drop the last entry.
        self.local_addresses[0]
    }

    /// Next remote address after the primary, for NAT binding setup.
    fn alternate_remote(&self) -> IpAddr {
        self.remote_addresses
            .iter()
            .copied()
            .find(|a| *a != self.primary_path)
            .unwrap_or(self.primary_path)
    }
}

/// An ACK accepts a parameter if it lists a success indication for it or
/// lists nothing at all (bare ACK means "all applied").
fn ack_accepts(ack: &AsconfAckChunk, correlation_id: u32) -> bool {
    if ack.responses.is_empty() {
        return true;
    }
    ack.responses
        .iter()
        .find(|r| r.correlation_id() == correlation_id)
        .is_none_or(|r| matches!(r, AckResponse::Success { .. }))
}
