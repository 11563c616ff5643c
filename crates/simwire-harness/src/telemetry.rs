//! Telemetry capture for test assertions.

use simwire_core::TelemetrySink;

/// Sink that records every emitted signal in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Vec<(&'static str, f64)>,
}

impl RecordingSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded `(signal, value)` pairs in emission order.
    #[must_use]
    pub fn records(&self) -> &[(&'static str, f64)] {
        &self.records
    }

    /// Every value emitted for `signal`.
    #[must_use]
    pub fn values(&self, signal: &str) -> Vec<f64> {
        self.records.iter().filter(|(s, _)| *s == signal).map(|(_, v)| *v).collect()
    }

    /// Most recent value emitted for `signal`.
    #[must_use]
    pub fn last(&self, signal: &str) -> Option<f64> {
        self.records.iter().rev().find(|(s, _)| *s == signal).map(|(_, v)| *v)
    }

    /// Number of emissions of `signal`.
    #[must_use]
    pub fn count(&self, signal: &str) -> usize {
        self.records.iter().filter(|(s, _)| *s == signal).count()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&mut self, signal: &'static str, value: f64) {
        self.records.push((signal, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_and_queries() {
        let mut sink = RecordingSink::new();
        sink.emit("a", 1.0);
        sink.emit("b", 2.0);
        sink.emit("a", 3.0);

        assert_eq!(sink.values("a"), vec![1.0, 3.0]);
        assert_eq!(sink.last("a"), Some(3.0));
        assert_eq!(sink.count("b"), 1);
        assert_eq!(sink.last("missing"), None);
    }
}
