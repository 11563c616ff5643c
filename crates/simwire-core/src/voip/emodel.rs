//! Simplified ITU-T G.107 E-model: effective delay and loss percentage to
//! an R-factor, then to a bounded MOS estimate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// E-model tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EModelParams {
    /// Equipment impairment factor (codec dependent).
    pub ie: f64,
    /// Packet-loss robustness factor of the codec.
    pub bpl: f64,
    /// Advantage factor (expectation adjustment, usually 0).
    pub a: f64,
    /// Basic signal-to-noise ratio term.
    pub ro: f64,
}

impl Default for EModelParams {
    fn default() -> Self {
        Self { ie: 5.0, bpl: 10.0, a: 0.0, ro: 93.2 }
    }
}

/// Map one-way delay and loss percentage to a MOS estimate in [1.0, 4.5].
///
/// Delay impairment `Id` grows linearly and picks up a second slope past
/// the 177.3 ms interactivity knee; loss impairment `Ie,eff` saturates
/// toward 95 with the codec's `Bpl` controlling the onset.
#[must_use]
pub fn e_model(params: &EModelParams, delay: Duration, loss_pct: f64) -> f64 {
    let delay_ms = delay.as_secs_f64() * 1000.0;

    let mut id = 0.024 * delay_ms;
    if delay_ms > 177.3 {
        id += 0.11 * (delay_ms - 177.3);
    }

    let ie_eff = params.ie + (95.0 - params.ie) * loss_pct / (loss_pct + params.bpl);

    let r = params.ro - id - ie_eff + params.a;

    let mos = if r < 0.0 {
        1.0
    } else if r > 100.0 {
        4.5
    } else {
        1.0 + 0.035 * r + 7.0e-6 * r * (r - 60.0) * (100.0 - r)
    };
    mos.clamp(1.0, 4.5)
}
