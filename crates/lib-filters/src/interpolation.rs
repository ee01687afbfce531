//! Interpolation of tabulated amplitude/phase responses.

use crate::base::Interpolation;
use lib_types::units::Hertz;
use std::f64::consts::PI;

/// Remove 2π discontinuities from a phase sequence in radians.
pub fn unwrap_phase(phases: &[f64]) -> Vec<f64> {
    let mut unwrapped: Vec<f64> = Vec::with_capacity(phases.len());
    let mut offset = 0.0;
    let tau = 2.0 * PI;

    for (i, &phase) in phases.iter().enumerate() {
        if i > 0 {
            let diff = phase + offset - unwrapped[i - 1];
            if diff > PI {
                offset -= tau * ((diff + PI) / tau).floor();
            } else if diff < -PI {
                offset += tau * ((-diff + PI) / tau).floor();
            }
        }
        unwrapped.push(phase + offset);
    }

    unwrapped
}

/// Interpolate `values` tabulated at `freqs` onto `targets`.
///
/// Targets outside the table take the value of the nearest end row. For
/// `LogLinear` the abscissa is log-frequency; set `log_values` to also
/// interpolate the ordinate in log space (amplitudes only, all positive).
/// An empty table, or one whose columns differ in length, yields NaN.
pub fn interpolate_table(
    freqs: &[Hertz],
    values: &[f64],
    targets: &[Hertz],
    method: Interpolation,
    log_values: bool,
) -> Vec<f64> {
    targets
        .iter()
        .map(|t| interpolate_single(freqs, values, t.0, method, log_values))
        .collect()
}

fn interpolate_single(
    freqs: &[Hertz],
    values: &[f64],
    target: f64,
    method: Interpolation,
    log_values: bool,
) -> f64 {
    if freqs.is_empty() || freqs.len() != values.len() {
        return f64::NAN;
    }

    let last = freqs.len() - 1;
    if target <= freqs[0].0 {
        return values[0];
    }
    if target >= freqs[last].0 {
        return values[last];
    }

    // Find bracketing indices
    let mut lower = 0;
    let mut upper = last;
    while upper - lower > 1 {
        let mid = (lower + upper) / 2;
        if freqs[mid].0 <= target {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    let (f0, f1) = (freqs[lower].0, freqs[upper].0);
    let (v0, v1) = (values[lower], values[upper]);

    match method {
        Interpolation::Nearest => {
            if target - f0 <= f1 - target {
                v0
            } else {
                v1
            }
        }
        Interpolation::Linear => v0 + (target - f0) / (f1 - f0) * (v1 - v0),
        Interpolation::LogLinear => {
            let frac = (target.ln() - f0.ln()) / (f1.ln() - f0.ln());
            if log_values {
                (v0.ln() + frac * (v1.ln() - v0.ln())).exp()
            } else {
                v0 + frac * (v1 - v0)
            }
        }
    }
}
