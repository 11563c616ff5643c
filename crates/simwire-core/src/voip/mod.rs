//! VoIP receiver: talkspurt reconstruction and call-quality scoring.
//!
//! Much simpler than the other two engines but the same shape: packets in
//! via [`VoipReceiver::handle_packet`], the talkspurt-finish self-timer in
//! [`VoipReceiver::tick`], results out through the telemetry sink. A
//! talkspurt is evaluated when an incoming packet starts the next spurt or
//! when the silence timer fires, whichever comes first.

mod emodel;
mod receiver;

pub use emodel::{EModelParams, e_model};
pub use receiver::{TalkspurtStatus, VoicePacket, VoipConfig, VoipReceiver};

/// Signal names emitted through the telemetry sink.
pub mod signals {
    /// Fraction of the talkspurt's packets lost in the network.
    pub const PACKET_LOSS_RATE: &str = "voip.packet_loss_rate";
    /// Mean network delay of received packets, seconds.
    pub const PACKET_DELAY: &str = "voip.packet_delay";
    /// Configured jitter-buffer playout delay, seconds.
    pub const PLAYOUT_DELAY: &str = "voip.playout_delay";
    /// Fraction of packets missing at playout (lost or late).
    pub const PLAYOUT_LOSS_RATE: &str = "voip.playout_loss_rate";
    /// Estimated mean opinion score, 1.0..=4.5.
    pub const MOS: &str = "voip.mos";
    /// Fraction of packets dropped by the bounded reorder buffer.
    pub const TAILDROP_LOSS_RATE: &str = "voip.taildrop_loss_rate";
}
