//! SCTP association engine: dynamic address reconfiguration (ASCONF) and
//! chunk-authentication state for one association.
//!
//! The association is a pure state machine like the other engines: inbound
//! chunks arrive through [`Association::handle_packet`], timers fire in
//! [`Association::tick`], and transmissions come back as [`SctpAction`]s.
//!
//! The hard invariant is mutual exclusion of address-change requests: at
//! most one ASCONF may be in flight per association, and while one is
//! outstanding only verbatim retransmission of the retained chunk is
//! permitted. Malformed or unauthenticated input is ignored without an
//! acknowledgment, deliberately provoking the sender's retransmission
//! timer instead of an error reply.

mod association;
pub mod keys;

pub use association::{Association, AssociationConfig, SctpAction};
