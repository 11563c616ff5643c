//! Observability sink injected into the engines.
//!
//! Replaces simulator-global statistic registries with a trait object the
//! host supplies. Engines emit named numeric signals; what happens to them
//! (counters, scalar files, nothing) is the host's business.

/// Receiver for named numeric signals.
pub trait TelemetrySink {
    /// Record one observation of `signal`.
    fn emit(&mut self, signal: &'static str, value: f64);
}

/// Sink that discards every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&mut self, _signal: &'static str, _value: f64) {}
}
