//! External response-stage records.
//!
//! These mirror the StationXML response model: an instrument sensitivity
//! header followed by an ordered list of cascaded stages. They are produced
//! on demand from a channel's filter chain and serialized for interchange.

use crate::units::{Hertz, Seconds};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Overall sensitivity of a channel at its normalization frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSensitivity {
    /// Scalar gain of the full chain.
    pub value: f64,

    /// Frequency at which `value` applies.
    pub frequency: Hertz,

    pub input_units: String,
    pub output_units: String,
    pub input_units_description: String,
    pub output_units_description: String,
}

/// Transfer function type of a poles and zeros stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PzTransferFunctionType {
    #[default]
    #[serde(rename = "LAPLACE (RADIANS/SECOND)")]
    LaplaceRadians,
    #[serde(rename = "LAPLACE (HERTZ)")]
    LaplaceHertz,
    #[serde(rename = "DIGITAL (Z-TRANSFORM)")]
    Digital,
}

/// Transfer function type of a coefficients stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfTransferFunctionType {
    #[serde(rename = "ANALOG (RADIANS/SECOND)")]
    AnalogRadians,
    #[serde(rename = "ANALOG (HERTZ)")]
    AnalogHertz,
    #[default]
    #[serde(rename = "DIGITAL")]
    Digital,
}

/// Symmetry of stored FIR coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FirSymmetry {
    /// All coefficients are stored.
    #[default]
    #[serde(alias = "none")]
    None,
    /// Even total count; first half stored.
    #[serde(alias = "even")]
    Even,
    /// Odd total count; first half plus center stored.
    #[serde(alias = "odd")]
    Odd,
}

/// One row of a tabulated response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseListElement {
    pub frequency: Hertz,
    pub amplitude: f64,
    /// Phase in degrees.
    pub phase: f64,
}

/// Decimation block attached to a stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decimation {
    pub input_sample_rate: Hertz,
    pub factor: u32,
    pub offset: u32,
    pub delay: Seconds,
    pub correction: Seconds,
}

impl Decimation {
    /// A pass-through block (factor 1, no delay) at the given sample rate.
    pub fn unity(input_sample_rate: Hertz) -> Self {
        Self {
            input_sample_rate,
            factor: 1,
            offset: 0,
            delay: Seconds::ZERO,
            correction: Seconds::ZERO,
        }
    }

    /// Output sample rate after decimation.
    pub fn output_sample_rate(&self) -> Hertz {
        self.input_sample_rate / f64::from(self.factor.max(1))
    }
}

/// Stage-type specific payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage_type", rename_all = "snake_case")]
pub enum StageKind {
    PolesZeros {
        transfer_function_type: PzTransferFunctionType,
        normalization_factor: f64,
        normalization_frequency: Hertz,
        zeros: Vec<Complex64>,
        poles: Vec<Complex64>,
    },
    Coefficients {
        transfer_function_type: CfTransferFunctionType,
        numerator: Vec<f64>,
        denominator: Vec<f64>,
    },
    ResponseList {
        elements: Vec<ResponseListElement>,
    },
    Fir {
        symmetry: FirSymmetry,
        coefficients: Vec<f64>,
    },
}

impl StageKind {
    /// Short label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PolesZeros { .. } => "PolesZeros",
            Self::Coefficients { .. } => "Coefficients",
            Self::ResponseList { .. } => "ResponseList",
            Self::Fir { .. } => "FIR",
        }
    }
}

/// A single cascaded stage in an exported response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseStage {
    /// 1-based position in the cascade.
    pub stage_sequence_number: usize,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub stage_gain: f64,
    pub stage_gain_frequency: Hertz,

    pub input_units: String,
    pub output_units: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimation: Option<Decimation>,

    #[serde(flatten)]
    pub kind: StageKind,
}

/// Complete exported response: sensitivity header plus ordered stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub instrument_sensitivity: InstrumentSensitivity,
    pub response_stages: Vec<ResponseStage>,
}

impl Response {
    /// Create an empty response with the given sensitivity header.
    pub fn new(instrument_sensitivity: InstrumentSensitivity) -> Self {
        Self {
            instrument_sensitivity,
            response_stages: Vec::new(),
        }
    }

    /// Append a stage.
    pub fn push_stage(&mut self, stage: ResponseStage) {
        self.response_stages.push(stage);
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.response_stages.len()
    }

    /// Check if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.response_stages.is_empty()
    }

    /// Product of all stage gains.
    ///
    /// Only equals the instrument sensitivity when every stage gain is
    /// quoted at the same frequency.
    pub fn stage_gain_product(&self) -> f64 {
        self.response_stages.iter().map(|s| s.stage_gain).product()
    }
}
