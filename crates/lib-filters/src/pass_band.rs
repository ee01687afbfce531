//! Pass-band estimation from sampled amplitude responses.
//!
//! A window of consecutive grid points is considered flat when the
//! amplitude varies by no more than `tolerance` decades inside it. Flat
//! windows are merged into zones and the first zone is reported.

use lib_types::units::Hertz;
use serde::{Deserialize, Serialize};

/// Relative tolerance under which an amplitude response counts as constant.
const FLAT_RESPONSE_TOLERANCE: f64 = 1e-6;

/// Frequency interval with a flat response.
///
/// After intersecting several stages `low` may exceed `high`; the value is
/// kept as computed so callers can detect the inversion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassBand {
    pub low: Hertz,
    pub high: Hertz,
}

impl PassBand {
    pub fn new(low: Hertz, high: Hertz) -> Self {
        Self { low, high }
    }

    /// Arithmetic mean of the band edges.
    pub fn mean(&self) -> Hertz {
        Hertz((self.low.0 + self.high.0) / 2.0)
    }

    /// Whether intersection produced `low > high`.
    pub fn is_inverted(&self) -> bool {
        self.low.0 > self.high.0
    }

    /// Narrow to the overlap with another band.
    pub fn intersect(&self, other: &PassBand) -> PassBand {
        PassBand {
            low: Hertz(self.low.0.max(other.low.0)),
            high: Hertz(self.high.0.min(other.high.0)),
        }
    }
}

/// Pass-band search parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassBandOptions {
    /// Number of grid points per sliding window.
    pub window_len: usize,

    /// Allowed amplitude variation inside a window, in decades.
    pub tolerance: f64,
}

impl Default for PassBandOptions {
    fn default() -> Self {
        Self {
            window_len: 5,
            tolerance: 0.1,
        }
    }
}

/// Estimate the pass band of a sampled amplitude response.
///
/// Returns `None` when the grid is empty, too short for the window, or no
/// window is flat.
pub fn estimate_pass_band(
    frequencies: &[Hertz],
    amplitudes: &[f64],
    options: &PassBandOptions,
) -> Option<PassBand> {
    let n = frequencies.len().min(amplitudes.len());
    if n == 0 {
        return None;
    }
    let frequencies = &frequencies[..n];
    let amplitudes = &amplitudes[..n];

    let (f_min, f_max) = frequencies
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| {
            (lo.min(f.0), hi.max(f.0))
        });

    if is_flat(amplitudes) {
        return Some(PassBand::new(Hertz(f_min), Hertz(f_max)));
    }

    let window_len = options.window_len.max(2);
    if n < window_len {
        tracing::debug!(
            "Frequency grid of {} points is too short for a {}-point pass-band window",
            n,
            window_len
        );
        return None;
    }

    let mut flat = vec![false; n];
    for start in 0..=n - window_len {
        let window = &amplitudes[start..start + window_len];
        let (lo, hi) = window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &a| {
                (lo.min(a), hi.max(a))
            });
        if lo <= 0.0 || !hi.is_finite() {
            continue;
        }
        if hi.log10() - lo.log10() <= options.tolerance {
            flat[start..start + window_len].iter_mut().for_each(|v| *v = true);
        }
    }

    let zones = flat_zones(&flat);
    if zones.len() > 1 {
        tracing::debug!("Found {} pass-band zones, using the first", zones.len());
    }

    zones
        .first()
        .map(|&(start, end)| PassBand::new(frequencies[start], frequencies[end]))
}

fn is_flat(amplitudes: &[f64]) -> bool {
    let mean = amplitudes.iter().sum::<f64>() / amplitudes.len() as f64;
    let scale = mean.abs().max(f64::MIN_POSITIVE);
    amplitudes
        .iter()
        .all(|a| ((a - mean) / scale).abs() <= FLAT_RESPONSE_TOLERANCE)
}

/// Inclusive index ranges of consecutive `true` runs.
fn flat_zones(flags: &[bool]) -> Vec<(usize, usize)> {
    let mut zones = Vec::new();
    let mut start = None;

    for (i, &flag) in flags.iter().enumerate() {
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                zones.push((s, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        zones.push((s, flags.len() - 1));
    }

    zones
}
