//! Physical units with type safety.
//!
//! Newtypes keep frequencies and durations from being mixed up, and the
//! unit registry maps the free-form unit tags carried by filter metadata to
//! their canonical abbreviation and descriptive name.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div};
use thiserror::Error;

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seconds(pub f64);

impl Seconds {
    pub const ZERO: Self = Self(0.0);
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Seconds {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, s| acc + s)
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hertz(pub f64);

impl Hertz {
    /// Angular frequency (omega = 2 * pi * f).
    #[inline]
    pub fn angular(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.0
    }
}

impl Div<f64> for Hertz {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

/// Generate `num_points` logarithmically spaced frequencies from
/// `10^start_exp` to `10^stop_exp` inclusive.
pub fn log_frequency_grid(start_exp: f64, stop_exp: f64, num_points: usize) -> Vec<Hertz> {
    match num_points {
        0 => Vec::new(),
        1 => vec![Hertz(10f64.powf(start_exp))],
        n => {
            let step = (stop_exp - start_exp) / (n - 1) as f64;
            (0..n)
                .map(|i| Hertz(10f64.powf(start_exp + i as f64 * step)))
                .collect()
        }
    }
}

/// Default evaluation grid: 100 points from 1e-4 Hz to 1e4 Hz.
pub fn default_frequency_grid() -> Vec<Hertz> {
    log_frequency_grid(-4.0, 4.0, 100)
}

/// Unit tag could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown unit: '{0}'")]
pub struct UnknownUnit(pub String);

/// A physical unit known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Unit {
    /// Descriptive name, e.g. "milliVolt".
    pub name: &'static str,

    /// Short symbol, e.g. "mV".
    pub abbreviation: &'static str,

    /// Extra spellings accepted on lookup.
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

const COUNT_ABBREVIATION: &str = "count";

static UNITS: &[Unit] = &[
    Unit { name: "digital counts", abbreviation: COUNT_ABBREVIATION, aliases: &["counts"] },
    Unit { name: "Volt", abbreviation: "V", aliases: &["volts"] },
    Unit { name: "milliVolt", abbreviation: "mV", aliases: &["millivolts"] },
    Unit { name: "microVolt", abbreviation: "uV", aliases: &["microvolts"] },
    Unit { name: "Tesla", abbreviation: "T", aliases: &[] },
    Unit { name: "nanoTesla", abbreviation: "nT", aliases: &["nanoteslas"] },
    Unit { name: "Volt per meter", abbreviation: "V/m", aliases: &["volts per meter"] },
    Unit { name: "milliVolt per kilometer", abbreviation: "mV/km", aliases: &["millivolts per kilometer"] },
    Unit { name: "meter", abbreviation: "m", aliases: &["meters", "metre"] },
    Unit { name: "kilometer", abbreviation: "km", aliases: &["kilometers"] },
    Unit { name: "second", abbreviation: "s", aliases: &["seconds"] },
    Unit { name: "Ampere", abbreviation: "A", aliases: &["amperes", "amps"] },
    Unit { name: "Ohm", abbreviation: "Ohm", aliases: &["ohms"] },
    Unit { name: "Hertz", abbreviation: "Hz", aliases: &[] },
    Unit { name: "unknown", abbreviation: "unknown", aliases: &[] },
];

/// Resolve a unit tag (name, abbreviation or alias; case insensitive).
pub fn get_unit_object(tag: &str) -> Result<&'static Unit, UnknownUnit> {
    let needle = tag.trim();
    UNITS
        .iter()
        .find(|unit| {
            unit.name.eq_ignore_ascii_case(needle)
                || unit.abbreviation.eq_ignore_ascii_case(needle)
                || unit.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
        })
        .ok_or_else(|| UnknownUnit(tag.to_string()))
}

/// Whether a unit tag denotes raw digitizer counts.
pub fn is_digital_count(tag: &str) -> bool {
    get_unit_object(tag).map_or(false, |unit| unit.abbreviation == COUNT_ABBREVIATION)
}
