//! Error types for wire-format parsing.
//!
//! Every variant describes a structural defect in received bytes. The
//! engines treat all of these as "drop and count" — a malformed datagram
//! never aborts a router or association (only configuration errors are
//! fatal, and those live in the core crate).

use std::net::Ipv4Addr;

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire formats.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer ended before the structure it claims to hold.
    #[error("truncated input: needed {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required to finish parsing
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// RIP command byte is neither Request (1) nor Response (2).
    #[error("invalid RIP command: {0:#04x}")]
    InvalidCommand(u8),

    /// RIP version byte is unsupported.
    #[error("unsupported RIP version: {0}")]
    UnsupportedVersion(u8),

    /// A must-be-zero field carried a nonzero value.
    #[error("reserved field is not zero")]
    ReservedFieldNotZero,

    /// Packet body is not a whole number of route entries.
    #[error("RIP body length {0} is not a multiple of the entry size")]
    RaggedEntryList(usize),

    /// More route entries than a single datagram may carry.
    #[error("too many route entries: {count} exceeds {max}")]
    TooManyEntries {
        /// Entries present in the packet
        count: usize,
        /// Permitted maximum per datagram
        max: usize,
    },

    /// Netmask bits are not contiguous.
    #[error("non-contiguous netmask: {0}")]
    InvalidNetmask(Ipv4Addr),

    /// Prefix length exceeds the address width.
    #[error("invalid prefix length: {0}")]
    InvalidPrefix(u8),

    /// Chunk type byte not understood at this layer.
    #[error("unknown chunk type: {0:#04x}")]
    UnknownChunkType(u8),

    /// Parameter TLV type not valid in its context.
    #[error("unknown parameter type: {0:#06x}")]
    UnknownParameterType(u16),

    /// Address parameter type is neither IPv4 nor IPv6.
    #[error("unknown address parameter type: {0:#06x}")]
    UnknownAddressType(u16),

    /// A TLV length field disagrees with the bytes present.
    #[error("length field mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length the TLV header declared
        declared: usize,
        /// Length implied by the surrounding buffer
        actual: usize,
    },
}
