//! Talkspurt reconstruction state machine.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{EModelParams, e_model, signals};
use crate::telemetry::TelemetrySink;

/// One voice packet as delivered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePacket<I> {
    /// Talkspurt this packet belongs to.
    pub talkspurt_id: u32,
    /// Total packets the sender emitted for this talkspurt.
    pub talkspurt_packets: u32,
    /// Position of this packet within the talkspurt.
    pub packet_id: u32,
    /// Sender-side creation instant.
    pub created_at: I,
    /// Nominal voice duration of the talkspurt.
    pub voice_duration: Duration,
}

/// Receiver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoipConfig {
    /// Jitter-buffer target: playout happens this long after the first
    /// packet of a talkspurt arrives.
    pub playout_delay: Duration,
    /// Slack after the last scheduled playout before scoring the spurt.
    pub mos_spare_time: Duration,
    /// Bound on packets awaiting playout; overflow is dropped (taildrop).
    pub buffer_packets: usize,
    /// E-model parameters used for scoring.
    pub emodel: EModelParams,
}

impl Default for VoipConfig {
    fn default() -> Self {
        Self {
            playout_delay: Duration::from_millis(20),
            mos_spare_time: Duration::from_millis(100),
            buffer_packets: 50,
            emodel: EModelParams::default(),
        }
    }
}

/// Lifecycle of the receiver's current talkspurt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkspurtStatus {
    /// No talkspurt seen yet.
    Empty,
    /// Collecting packets.
    Active,
    /// Evaluated and closed.
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct PacketRecord<I> {
    packet_id: u32,
    created_at: I,
    arrival: I,
    playout: I,
}

#[derive(Debug, Clone)]
struct Talkspurt<I> {
    status: TalkspurtStatus,
    id: u32,
    expected_packets: u32,
    packets: Vec<PacketRecord<I>>,
}

impl<I> Talkspurt<I> {
    fn empty() -> Self {
        Self { status: TalkspurtStatus::Empty, id: 0, expected_packets: 0, packets: Vec::new() }
    }

    /// Continuity check: the packet must describe the same talkspurt and
    /// fall inside its announced extent, and must not repeat a packet id.
    fn accepts(&self, pkt: &VoicePacket<I>) -> bool {
        pkt.talkspurt_packets == self.expected_packets
            && pkt.packet_id < self.expected_packets
            && !self.packets.iter().any(|p| p.packet_id == pkt.packet_id)
    }
}

/// Jitter-buffer receiver scoring one voice stream.
///
/// At most one talkspurt is active at any time. A new one starts when a
/// packet carries a different talkspurt id; the old one is evaluated at
/// that moment or when the silence self-timer fires, whichever happens
/// first.
#[derive(Debug)]
pub struct VoipReceiver<I, S> {
    config: VoipConfig,
    current: Talkspurt<I>,
    finish_at: Option<I>,
    taildropped: u32,
    sink: S,
}

impl<I, S> VoipReceiver<I, S>
where
    I: Copy + Ord + Send + Sync + Add<Duration, Output = I> + Sub<Output = Duration>,
    S: TelemetrySink,
{
    /// Create a receiver with the given tuning and telemetry sink.
    pub fn new(config: VoipConfig, sink: S) -> Self {
        Self { config, current: Talkspurt::empty(), finish_at: None, taildropped: 0, sink }
    }

    /// Status of the current talkspurt.
    #[must_use]
    pub fn status(&self) -> TalkspurtStatus {
        self.current.status
    }

    /// Id of the current talkspurt (meaningless while `Empty`).
    #[must_use]
    pub fn talkspurt_id(&self) -> u32 {
        self.current.id
    }

    /// Packets buffered for the current talkspurt.
    #[must_use]
    pub fn packets_buffered(&self) -> usize {
        self.current.packets.len()
    }

    /// The telemetry sink, for inspection by the host.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Earliest instant at which `tick` has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<I> {
        if self.current.status == TalkspurtStatus::Active { self.finish_at } else { None }
    }

    /// Process one arriving voice packet.
    pub fn handle_packet(&mut self, pkt: &VoicePacket<I>, now: I) {
        match self.current.status {
            TalkspurtStatus::Active if pkt.talkspurt_id == self.current.id => {
                if !self.current.accepts(pkt) {
                    trace!(
                        talkspurt = pkt.talkspurt_id,
                        packet = pkt.packet_id,
                        "discontinuous packet dropped"
                    );
                    return;
                }
                self.buffer_packet(pkt, now);
            },
            TalkspurtStatus::Active => {
                // The next spurt starting is the end-marker for this one.
                self.evaluate(false);
                self.start_talkspurt(pkt, now);
            },
            TalkspurtStatus::Empty | TalkspurtStatus::Finished => {
                self.start_talkspurt(pkt, now);
            },
        }
    }

    /// Fire the silence self-timer if it is due.
    pub fn tick(&mut self, now: I) {
        if self.current.status == TalkspurtStatus::Active
            && self.finish_at.is_some_and(|due| now >= due)
        {
            self.evaluate(true);
            self.finish_at = None;
        }
    }

    fn start_talkspurt(&mut self, pkt: &VoicePacket<I>, now: I) {
        let playout = now + self.config.playout_delay;
        self.current = Talkspurt {
            status: TalkspurtStatus::Active,
            id: pkt.talkspurt_id,
            expected_packets: pkt.talkspurt_packets,
            packets: vec![PacketRecord {
                packet_id: pkt.packet_id,
                created_at: pkt.created_at,
                arrival: now,
                playout,
            }],
        };
        self.taildropped = 0;
        self.finish_at = Some(playout + self.config.mos_spare_time);
        debug!(talkspurt = pkt.talkspurt_id, expected = pkt.talkspurt_packets, "talkspurt started");
    }

    fn buffer_packet(&mut self, pkt: &VoicePacket<I>, now: I) {
        // INVARIANT: Active talkspurts hold at least their first packet.
        let Some(first) = self.current.packets.first().copied() else {
            return;
        };
        if pkt.created_at < first.created_at {
            trace!(packet = pkt.packet_id, "packet predates talkspurt start; dropped");
            return;
        }

        // Playout keeps the sender's pacing relative to the first packet.
        let playout = first.playout + (pkt.created_at - first.created_at);

        let pending = self.current.packets.iter().filter(|p| p.playout > now).count();
        if pending >= self.config.buffer_packets {
            self.taildropped += 1;
            trace!(packet = pkt.packet_id, "jitter buffer full; packet dropped");
            return;
        }

        self.current.packets.push(PacketRecord {
            packet_id: pkt.packet_id,
            created_at: pkt.created_at,
            arrival: now,
            playout,
        });
        let finish = playout + self.config.mos_spare_time;
        self.finish_at = Some(match self.finish_at {
            Some(existing) => existing.max(finish),
            None => finish,
        });
    }

    /// Score the current talkspurt and emit the observability signals.
    fn evaluate(&mut self, finished_by_timer: bool) {
        let expected = f64::from(self.current.expected_packets.max(1));
        let received = self.current.packets.len() as f64;

        let loss_rate = (1.0 - received / expected).clamp(0.0, 1.0);

        let mean_delay = if self.current.packets.is_empty() {
            Duration::ZERO
        } else {
            let total: Duration =
                self.current.packets.iter().map(|p| p.arrival - p.created_at).sum();
            total / self.current.packets.len() as u32
        };

        let on_time = self.current.packets.iter().filter(|p| p.arrival <= p.playout).count();
        let playout_loss_rate = (1.0 - on_time as f64 / expected).clamp(0.0, 1.0);
        let taildrop_loss_rate = (f64::from(self.taildropped) / expected).clamp(0.0, 1.0);

        let mos = e_model(
            &self.config.emodel,
            mean_delay + self.config.playout_delay,
            playout_loss_rate * 100.0,
        );

        debug!(
            talkspurt = self.current.id,
            finished_by_timer,
            loss_rate,
            playout_loss_rate,
            mos,
            "talkspurt evaluated"
        );

        self.sink.emit(signals::PACKET_LOSS_RATE, loss_rate);
        self.sink.emit(signals::PACKET_DELAY, mean_delay.as_secs_f64());
        self.sink.emit(signals::PLAYOUT_DELAY, self.config.playout_delay.as_secs_f64());
        self.sink.emit(signals::PLAYOUT_LOSS_RATE, playout_loss_rate);
        self.sink.emit(signals::TAILDROP_LOSS_RATE, taildrop_loss_rate);
        self.sink.emit(signals::MOS, mos);

        self.current.status = TalkspurtStatus::Finished;
        self.current.packets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn t(millis: u64) -> T {
        T(ms(millis))
    }

    #[derive(Debug, Default)]
    struct VecSink(Vec<(&'static str, f64)>);

    impl TelemetrySink for VecSink {
        fn emit(&mut self, signal: &'static str, value: f64) {
            self.0.push((signal, value));
        }
    }

    impl VecSink {
        fn value(&self, signal: &'static str) -> f64 {
            self.0
                .iter()
                .rev()
                .find(|(s, _)| *s == signal)
                .map(|(_, v)| *v)
                .unwrap_or(f64::NAN)
        }
    }

    fn packet(spurt: u32, idx: u32, total: u32, created: T) -> VoicePacket<T> {
        VoicePacket {
            talkspurt_id: spurt,
            talkspurt_packets: total,
            packet_id: idx,
            created_at: created,
            voice_duration: ms(200),
        }
    }

    fn receiver() -> VoipReceiver<T, VecSink> {
        VoipReceiver::new(VoipConfig::default(), VecSink::default())
    }

    #[test]
    fn clean_talkspurt_scores_high() {
        let mut rx = receiver();

        // 10 packets, 20ms pacing, constant 30ms network delay
        for i in 0..10u32 {
            let created = t(u64::from(i) * 20);
            rx.handle_packet(&packet(1, i, 10, created), created + ms(30));
        }
        assert_eq!(rx.status(), TalkspurtStatus::Active);
        assert_eq!(rx.packets_buffered(), 10);

        let due = rx.next_wakeup().expect("finish timer armed");
        rx.tick(due);

        assert_eq!(rx.status(), TalkspurtStatus::Finished);
        let sink = rx.sink();
        assert_eq!(sink.value(signals::PACKET_LOSS_RATE), 0.0);
        assert_eq!(sink.value(signals::PLAYOUT_LOSS_RATE), 0.0);
        assert!((sink.value(signals::PACKET_DELAY) - 0.030).abs() < 1e-9);
        assert!(sink.value(signals::MOS) > 4.0);
    }

    #[test]
    fn network_loss_shows_in_loss_rate_and_mos() {
        let mut rx = receiver();

        // 7 of 10 packets arrive
        for i in [0u32, 1, 2, 4, 6, 8, 9] {
            let created = t(u64::from(i) * 20);
            rx.handle_packet(&packet(1, i, 10, created), created + ms(30));
        }
        let due = rx.next_wakeup().unwrap();
        rx.tick(due);

        let sink = rx.sink();
        assert!((sink.value(signals::PACKET_LOSS_RATE) - 0.3).abs() < 1e-9);
        assert!(sink.value(signals::MOS) < 4.0);
    }

    #[test]
    fn new_talkspurt_id_finishes_previous_one() {
        let mut rx = receiver();

        rx.handle_packet(&packet(1, 0, 5, t(0)), t(30));
        assert_eq!(rx.talkspurt_id(), 1);

        // Next spurt begins; spurt 1 gets evaluated right away
        rx.handle_packet(&packet(2, 0, 5, t(400)), t(430));
        assert_eq!(rx.talkspurt_id(), 2);
        assert_eq!(rx.status(), TalkspurtStatus::Active);
        assert!((rx.sink().value(signals::PACKET_LOSS_RATE) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn late_packet_counts_as_playout_loss() {
        let mut rx = receiver();

        rx.handle_packet(&packet(1, 0, 2, t(0)), t(10));
        // Created 20ms after the first but arrives 500ms late: its playout
        // slot (t=50ms) has long passed
        rx.handle_packet(&packet(1, 1, 2, t(20)), t(500));

        rx.tick(t(600));

        let sink = rx.sink();
        assert_eq!(sink.value(signals::PACKET_LOSS_RATE), 0.0);
        assert!((sink.value(signals::PLAYOUT_LOSS_RATE) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn discontinuous_packets_are_dropped() {
        let mut rx = receiver();

        rx.handle_packet(&packet(1, 0, 10, t(0)), t(30));
        // Wrong talkspurt extent
        rx.handle_packet(&packet(1, 1, 99, t(20)), t(50));
        // Duplicate packet id
        rx.handle_packet(&packet(1, 0, 10, t(0)), t(60));
        // Out-of-range packet id
        rx.handle_packet(&packet(1, 10, 10, t(200)), t(230));

        assert_eq!(rx.packets_buffered(), 1);
    }

    #[test]
    fn bounded_buffer_taildrops() {
        let config = VoipConfig { buffer_packets: 2, ..VoipConfig::default() };
        let mut rx = VoipReceiver::new(config, VecSink::default());

        // All four arrive at t=0 with future playouts; only two fit
        for i in 0..4u32 {
            rx.handle_packet(&packet(1, i, 4, t(u64::from(i) * 20)), t(1));
        }
        assert_eq!(rx.packets_buffered(), 2);

        let due = rx.next_wakeup().unwrap();
        rx.tick(due);
        assert_eq!(rx.sink().value(signals::TAILDROP_LOSS_RATE), 0.5);
    }

    #[test]
    fn tick_before_deadline_is_a_noop() {
        let mut rx = receiver();
        rx.handle_packet(&packet(1, 0, 1, t(0)), t(10));

        rx.tick(t(11));
        assert_eq!(rx.status(), TalkspurtStatus::Active);

        let due = rx.next_wakeup().unwrap();
        rx.tick(due);
        assert_eq!(rx.status(), TalkspurtStatus::Finished);
        assert_eq!(rx.next_wakeup(), None);
    }
}
