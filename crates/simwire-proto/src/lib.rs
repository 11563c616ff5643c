//! Wire formats for the simwire protocol engines.
//!
//! Two codecs live here: the RIPv2 datagram format (RFC 2453) and the SCTP
//! chunk subset used for dynamic address reconfiguration and chunk
//! authentication (RFC 4960/5061/4895). Both are plain big-endian binary;
//! decoding performs structural validation only and never allocates before
//! the framing has been checked.
//!
//! Protocol *semantics* — metric ranges, serial-number windows, split
//! horizon — are enforced by the engines in `simwire-core`, which treat
//! every error from this crate as "drop the datagram and count it".

pub mod errors;
pub mod rip;
pub mod sctp;

pub use errors::{ProtocolError, Result};
pub use rip::{Ipv4Net, RipCommand, RipEntry, RipPacket};
pub use sctp::{
    AckResponse, AsconfAckChunk, AsconfChunk, AsconfParam, AsconfParamKind, AuthChunk, Chunk,
    SctpPacket,
};
