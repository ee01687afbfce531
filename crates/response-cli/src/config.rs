//! Analysis configuration loading and validation.

use anyhow::{Context, Result};
use lib_filters::{ComplexResponseOptions, Interpolation, ResponseOptions};
use lib_types::units::{log_frequency_grid, Hertz};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the response, sensitivity and export commands.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Evaluation grid.
    #[serde(default)]
    pub grid: GridConfig,

    /// Composite response flags.
    #[serde(default)]
    pub response: ResponseConfig,

    /// Export parameters.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Log-spaced frequency grid, bounds as powers of ten.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    #[serde(default = "default_start_exp")]
    pub start_exp: f64,

    #[serde(default = "default_stop_exp")]
    pub stop_exp: f64,

    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

fn default_start_exp() -> f64 { -4.0 }
fn default_stop_exp() -> f64 { 4.0 }
fn default_num_points() -> usize { 100 }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start_exp: default_start_exp(),
            stop_exp: default_stop_exp(),
            num_points: default_num_points(),
        }
    }
}

impl GridConfig {
    pub fn frequencies(&self) -> Vec<Hertz> {
        log_frequency_grid(self.start_exp, self.stop_exp, self.num_points)
    }
}

/// Flags for composite response evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    #[serde(default)]
    pub include_delay: bool,

    #[serde(default)]
    pub normalize: bool,

    #[serde(default = "default_true")]
    pub include_decimation: bool,

    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_true() -> bool { true }

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            include_delay: false,
            normalize: false,
            include_decimation: default_true(),
            interpolation: Interpolation::default(),
        }
    }
}

impl ResponseConfig {
    pub fn options(&self) -> ComplexResponseOptions {
        ComplexResponseOptions {
            include_delay: self.include_delay,
            normalize: self.normalize,
            include_decimation: self.include_decimation,
            stage: ResponseOptions {
                interpolation: self.interpolation,
            },
        }
    }
}

/// Export parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Sample rate recorded on stages; the channel's own rate when unset.
    #[serde(default)]
    pub sample_rate: Option<Hertz>,

    /// Pinned normalization frequency; derived from the pass band when unset.
    #[serde(default)]
    pub normalization_frequency: Option<Hertz>,
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AnalysisConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| "Failed to parse config as JSON")?
    } else {
        toml::from_str(&content)
            .with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    let grid = &config.grid;
    if !(grid.start_exp.is_finite() && grid.stop_exp.is_finite()) || grid.start_exp >= grid.stop_exp {
        anyhow::bail!(
            "Grid bounds must satisfy start_exp < stop_exp (got {} and {})",
            grid.start_exp,
            grid.stop_exp
        );
    }
    if grid.num_points < 2 {
        anyhow::bail!("Grid needs at least 2 points (got {})", grid.num_points);
    }

    for (label, value) in [
        ("sample_rate", config.export.sample_rate),
        ("normalization_frequency", config.export.normalization_frequency),
    ] {
        if let Some(Hertz(f)) = value {
            if !(f.is_finite() && f > 0.0) {
                anyhow::bail!("{} must be a positive frequency (got {})", label, f);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AnalysisConfig = toml::from_str("").unwrap();

        assert_eq!(config.grid.num_points, 100);
        assert!(config.response.include_decimation);
        assert!(!config.response.include_delay);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_toml_overrides() {
        let config: AnalysisConfig = toml::from_str(
            r#"
[grid]
start_exp = -2.0
stop_exp = 2.0
num_points = 41

[response]
normalize = true
interpolation = "log_linear"

[export]
sample_rate = 256.0
"#,
        )
        .unwrap();

        assert_eq!(config.grid.frequencies().len(), 41);
        let options = config.response.options();
        assert!(options.normalize);
        assert_eq!(options.stage.interpolation, Interpolation::LogLinear);
        assert_eq!(config.export.sample_rate, Some(Hertz(256.0)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<AnalysisConfig>("[grid]\npoints = 10\n").is_err());
    }

    #[test]
    fn test_inverted_grid_rejected() {
        let mut config = AnalysisConfig::default();
        config.grid.start_exp = 3.0;
        config.grid.stop_exp = 1.0;
        assert!(validate_config(&config).is_err());
    }
}
