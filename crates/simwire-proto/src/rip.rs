//! RIP version 2 wire format (RFC 2453 subset).
//!
//! A RIP datagram is a 4-byte header (command, version, must-be-zero pad)
//! followed by up to 25 fixed 20-byte route entries, all big endian. The
//! entry is parsed zero-copy from untrusted bytes: every bit pattern is a
//! structurally valid entry, so semantic checks (metric range, address
//! sanity) belong to the routing engine, not this layer.

use std::{fmt, net::Ipv4Addr};

use bytes::BufMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// UDP port RIP routers bind and send to.
pub const RIP_UDP_PORT: u16 = 520;

/// IPv4 multicast group for unsolicited RIPv2 responses.
pub const RIP_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 9);

/// Metric value meaning "unreachable".
pub const INFINITE_METRIC: u32 = 16;

/// Protocol version implemented here.
pub const RIP_VERSION: u8 = 2;

/// Route entries a single datagram may carry (512-byte UDP payload bound).
pub const MAX_ENTRIES_PER_PACKET: usize = 25;

/// Address family identifier for IPv4.
pub const AF_INET: u16 = 2;

/// RIP command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RipCommand {
    /// Ask a neighbor for routes (specific entries or the whole table).
    Request,
    /// Advertise routes, solicited or unsolicited.
    Response,
}

impl RipCommand {
    /// Wire value of this command.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Request => 1,
            Self::Response => 2,
        }
    }

    /// Parse a command byte.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidCommand` for anything but 1 or 2
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            other => Err(ProtocolError::InvalidCommand(other)),
        }
    }
}

/// An IPv4 network: address plus prefix length.
///
/// The wire format carries netmasks; the engines think in prefixes. Both
/// conversions live here so the contiguity check happens exactly once, at
/// the codec boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Net {
    /// Network address (host bits are preserved as given).
    pub address: Ipv4Addr,
    /// Prefix length, 0..=32.
    pub prefix_len: u8,
}

impl Ipv4Net {
    /// Create a network from an address and prefix length.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPrefix` if `prefix_len > 32`
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(ProtocolError::InvalidPrefix(prefix_len));
        }
        Ok(Self { address, prefix_len })
    }

    /// Create a network from an address and a dotted netmask.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidNetmask` if the mask bits are not contiguous
    pub fn from_mask(address: Ipv4Addr, mask: Ipv4Addr) -> Result<Self> {
        let bits = u32::from(mask);
        let prefix_len = bits.leading_ones() as u8;
        if bits != prefix_to_mask_bits(prefix_len) {
            return Err(ProtocolError::InvalidNetmask(mask));
        }
        Ok(Self { address, prefix_len })
    }

    /// Netmask corresponding to this prefix length.
    #[must_use]
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(prefix_to_mask_bits(self.prefix_len))
    }

    /// True if `addr` falls inside this network.
    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = prefix_to_mask_bits(self.prefix_len);
        u32::from(addr) & mask == u32::from(self.address) & mask
    }
}

impl fmt::Display for Ipv4Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

fn prefix_to_mask_bits(prefix_len: u8) -> u32 {
    if prefix_len == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix_len.min(32))) }
}

/// Fixed 20-byte RIPv2 route entry (big endian).
///
/// Fields are stored as raw byte arrays so the struct can be cast from
/// untrusted network bytes without alignment or validity concerns.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, PartialEq, Eq)]
pub struct RipEntry {
    address_family: [u8; 2],
    route_tag: [u8; 2],
    address: [u8; 4],
    netmask: [u8; 4],
    next_hop: [u8; 4],
    metric: [u8; 4],
}

impl RipEntry {
    /// Size of the serialized entry.
    pub const SIZE: usize = 20;

    /// Build an IPv4 route entry.
    #[must_use]
    pub fn new(dest: Ipv4Net, metric: u32) -> Self {
        Self {
            address_family: AF_INET.to_be_bytes(),
            route_tag: [0; 2],
            address: dest.address.octets(),
            netmask: dest.netmask().octets(),
            next_hop: [0; 4],
            metric: metric.to_be_bytes(),
        }
    }

    /// Build the single entry of a whole-table request: family 0,
    /// metric infinite (RFC 2453 §3.9.1).
    #[must_use]
    pub fn whole_table_request() -> Self {
        Self {
            address_family: [0; 2],
            route_tag: [0; 2],
            address: [0; 4],
            netmask: [0; 4],
            next_hop: [0; 4],
            metric: INFINITE_METRIC.to_be_bytes(),
        }
    }

    /// True if this entry encodes the whole-table request form.
    #[must_use]
    pub fn is_whole_table_request(&self) -> bool {
        self.address_family() == 0 && self.metric() == INFINITE_METRIC
    }

    /// Address family identifier (2 = IPv4).
    #[must_use]
    pub fn address_family(&self) -> u16 {
        u16::from_be_bytes(self.address_family)
    }

    /// Opaque route tag, carried unchanged between routers.
    #[must_use]
    pub fn route_tag(&self) -> u16 {
        u16::from_be_bytes(self.route_tag)
    }

    /// Destination network address.
    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    /// Destination netmask.
    #[must_use]
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.netmask)
    }

    /// Advertised next hop; 0.0.0.0 means "via the sender".
    #[must_use]
    pub fn next_hop(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.next_hop)
    }

    /// Advertised metric.
    #[must_use]
    pub fn metric(&self) -> u32 {
        u32::from_be_bytes(self.metric)
    }

    /// Destination as an [`Ipv4Net`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidNetmask` if the advertised mask is not
    ///   contiguous
    pub fn destination(&self) -> Result<Ipv4Net> {
        Ipv4Net::from_mask(self.address(), self.netmask())
    }

    /// Set the route tag.
    pub fn set_route_tag(&mut self, tag: u16) {
        self.route_tag = tag.to_be_bytes();
    }

    /// Set the advertised next hop.
    pub fn set_next_hop(&mut self, next_hop: Ipv4Addr) {
        self.next_hop = next_hop.octets();
    }

    /// Set the advertised metric.
    pub fn set_metric(&mut self, metric: u32) {
        self.metric = metric.to_be_bytes();
    }

    /// Serialized form of this entry.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }
}

impl fmt::Debug for RipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RipEntry")
            .field("address_family", &self.address_family())
            .field("route_tag", &self.route_tag())
            .field("address", &self.address())
            .field("netmask", &self.netmask())
            .field("next_hop", &self.next_hop())
            .field("metric", &self.metric())
            .finish()
    }
}

/// A complete RIP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipPacket {
    /// Request or Response.
    pub command: RipCommand,
    /// Route entries, at most [`MAX_ENTRIES_PER_PACKET`].
    pub entries: Vec<RipEntry>,
}

impl RipPacket {
    /// Size of the datagram header.
    pub const HEADER_SIZE: usize = 4;

    /// Create a packet.
    #[must_use]
    pub fn new(command: RipCommand, entries: Vec<RipEntry>) -> Self {
        Self { command, entries }
    }

    /// A request for the neighbor's entire routing table.
    #[must_use]
    pub fn whole_table_request() -> Self {
        Self::new(RipCommand::Request, vec![RipEntry::whole_table_request()])
    }

    /// True if this is a single-entry whole-table request.
    #[must_use]
    pub fn is_whole_table_request(&self) -> bool {
        self.command == RipCommand::Request
            && self.entries.len() == 1
            && self.entries[0].is_whole_table_request()
    }

    /// Serialized length of this packet.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        Self::HEADER_SIZE + self.entries.len() * RipEntry::SIZE
    }

    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TooManyEntries` if the entry list exceeds the
    ///   per-datagram bound (callers split before encoding)
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.entries.len() > MAX_ENTRIES_PER_PACKET {
            return Err(ProtocolError::TooManyEntries {
                count: self.entries.len(),
                max: MAX_ENTRIES_PER_PACKET,
            });
        }

        dst.put_u8(self.command.to_u8());
        dst.put_u8(RIP_VERSION);
        dst.put_u16(0);
        for entry in &self.entries {
            dst.put_slice(&entry.to_bytes());
        }
        Ok(())
    }

    /// Decode a datagram.
    ///
    /// All structural validation happens here: command byte, version,
    /// must-be-zero pad, body granularity, and the entry-count bound.
    /// Semantic checks (metric range, spoofed sources) are the engine's.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Truncated` if shorter than the header
    /// - `ProtocolError::InvalidCommand` / `UnsupportedVersion` /
    ///   `ReservedFieldNotZero` for a bad header
    /// - `ProtocolError::RaggedEntryList` if the body is not whole entries
    /// - `ProtocolError::TooManyEntries` past the datagram bound
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                expected: Self::HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let command = RipCommand::from_u8(bytes[0])?;
        if bytes[1] != RIP_VERSION {
            return Err(ProtocolError::UnsupportedVersion(bytes[1]));
        }
        if bytes[2] != 0 || bytes[3] != 0 {
            return Err(ProtocolError::ReservedFieldNotZero);
        }

        let body = &bytes[Self::HEADER_SIZE..];
        if body.len() % RipEntry::SIZE != 0 {
            return Err(ProtocolError::RaggedEntryList(body.len()));
        }
        let count = body.len() / RipEntry::SIZE;
        if count > MAX_ENTRIES_PER_PACKET {
            return Err(ProtocolError::TooManyEntries { count, max: MAX_ENTRIES_PER_PACKET });
        }

        let mut entries = Vec::with_capacity(count);
        let mut rest = body;
        while !rest.is_empty() {
            // INVARIANT: rest.len() is a nonzero multiple of RipEntry::SIZE,
            // so the prefix read cannot fail.
            let (entry, tail) = RipEntry::ref_from_prefix(rest)
                .map_err(|_| ProtocolError::Truncated { expected: RipEntry::SIZE, actual: rest.len() })?;
            entries.push(*entry);
            rest = tail;
        }

        Ok(Self { command, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_size() {
        assert_eq!(std::mem::size_of::<RipEntry>(), RipEntry::SIZE);
    }

    #[test]
    fn entry_round_trip() {
        let net = Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 24).unwrap();
        let mut entry = RipEntry::new(net, 3);
        entry.set_next_hop(Ipv4Addr::new(192, 168, 1, 1));
        entry.set_route_tag(7);

        let bytes = entry.to_bytes();
        let (parsed, rest) = RipEntry::ref_from_prefix(&bytes[..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.destination().unwrap(), net);
        assert_eq!(parsed.metric(), 3);
        assert_eq!(parsed.next_hop(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(parsed.route_tag(), 7);
    }

    #[test]
    fn packet_round_trip() {
        let net = Ipv4Net::new(Ipv4Addr::new(10, 1, 0, 0), 16).unwrap();
        let packet = RipPacket::new(RipCommand::Response, vec![RipEntry::new(net, 1)]);

        let mut wire = Vec::new();
        packet.encode(&mut wire).unwrap();
        assert_eq!(wire.len(), packet.wire_len());

        let parsed = RipPacket::decode(&wire).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn whole_table_request_form() {
        let packet = RipPacket::whole_table_request();
        assert!(packet.is_whole_table_request());

        let mut wire = Vec::new();
        packet.encode(&mut wire).unwrap();
        assert!(RipPacket::decode(&wire).unwrap().is_whole_table_request());
    }

    #[test]
    fn reject_bad_version() {
        let mut wire = Vec::new();
        RipPacket::new(RipCommand::Request, vec![]).encode(&mut wire).unwrap();
        wire[1] = 1;
        assert_eq!(RipPacket::decode(&wire), Err(ProtocolError::UnsupportedVersion(1)));
    }

    #[test]
    fn reject_ragged_body() {
        let mut wire = Vec::new();
        RipPacket::new(RipCommand::Response, vec![]).encode(&mut wire).unwrap();
        wire.extend_from_slice(&[0u8; 19]);
        assert_eq!(RipPacket::decode(&wire), Err(ProtocolError::RaggedEntryList(19)));
    }

    #[test]
    fn reject_nonzero_pad() {
        let mut wire = Vec::new();
        RipPacket::new(RipCommand::Response, vec![]).encode(&mut wire).unwrap();
        wire[3] = 0xFF;
        assert_eq!(RipPacket::decode(&wire), Err(ProtocolError::ReservedFieldNotZero));
    }

    #[test]
    fn netmask_contiguity() {
        let ok = Ipv4Net::from_mask(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(ok.unwrap().prefix_len, 24);

        let bad = Ipv4Net::from_mask(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(255, 0, 255, 0));
        assert!(matches!(bad, Err(ProtocolError::InvalidNetmask(_))));
    }

    #[test]
    fn net_contains() {
        let net = Ipv4Net::new(Ipv4Addr::new(10, 0, 1, 0), 24).unwrap();
        assert!(net.contains(Ipv4Addr::new(10, 0, 1, 200)));
        assert!(!net.contains(Ipv4Addr::new(10, 0, 2, 1)));
    }
}
