//! Survey filter files: a shared filter list plus channel definitions.
//!
//! The same layout is accepted as JSON or TOML, chosen by file extension:
//!
//! ```toml
//! [[filters]]
//! type = "coefficient"
//! name = "adc"
//! units_in = "V"
//! units_out = "count"
//! gain = 8388608.0
//!
//! [[channels]]
//! name = "ex"
//! sample_rate = 256.0
//! filters = ["adc"]
//! ```

use crate::error::{MetadataError, MetadataResult};
use crate::filters_list::build_filters_list;
use crate::registry::{ChannelFilters, FilterRegistry};
use lib_filters::ChannelResponse;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SurveyDocument {
    #[serde(default)]
    filters: Value,

    #[serde(default)]
    channels: Vec<ChannelFilters>,
}

/// All filters of a survey and the channels that reference them.
#[derive(Clone, Debug, Default)]
pub struct SurveyFilters {
    pub registry: FilterRegistry,
    pub channels: Vec<ChannelFilters>,
}

impl SurveyFilters {
    /// Load a survey file, `.toml` as TOML and anything else as JSON.
    pub fn load(path: &Path) -> MetadataResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let survey = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&content)?,
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content)?,
            Some(ext) => return Err(MetadataError::UnsupportedFormat(ext.to_string())),
            None => Self::from_json_str(&content)?,
        };

        tracing::info!(
            "Loaded {} filters and {} channels from {}",
            survey.registry.len(),
            survey.channels.len(),
            path.display()
        );
        Ok(survey)
    }

    pub fn from_json_str(content: &str) -> MetadataResult<Self> {
        let document: SurveyDocument = serde_json::from_str(content)?;
        Self::from_document(document)
    }

    pub fn from_toml_str(content: &str) -> MetadataResult<Self> {
        let document: SurveyDocument = toml::from_str(content)?;
        Self::from_document(document)
    }

    fn from_document(document: SurveyDocument) -> MetadataResult<Self> {
        let registry = FilterRegistry::from_filters(build_filters_list(&document.filters)?)?;

        for channel in &document.channels {
            if let Some(missing) = channel.filters.iter().find(|name| registry.get(name).is_none()) {
                return Err(MetadataError::MissingFilter {
                    channel: channel.name.clone(),
                    filter: missing.clone(),
                });
            }
        }

        Ok(Self {
            registry,
            channels: document.channels,
        })
    }

    pub fn channel(&self, name: &str) -> MetadataResult<&ChannelFilters> {
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MetadataError::MissingChannel(name.to_string()))
    }

    /// Response chain of a named channel.
    pub fn channel_response(&self, name: &str) -> MetadataResult<ChannelResponse> {
        self.registry.channel_response(self.channel(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_filters::{FilterStage, FilterType};
    use lib_types::units::Hertz;

    const SURVEY_JSON: &str = r#"{
        "filters": [
            {"type": "pole_zero", "name": "coil", "units_in": "nT", "units_out": "mV",
             "poles": [[-3.14159, 0.0]], "normalization_factor": 3.14159},
            {"type": "coefficient", "name": "adc", "units_in": "mV", "units_out": "count", "gain": 1000.0}
        ],
        "channels": [
            {"name": "hx", "sample_rate": 256.0, "filters": ["coil", "adc"]}
        ]
    }"#;

    const SURVEY_TOML: &str = r#"
[[filters]]
type = "coefficient"
name = "dipole"
units_in = "mV/km"
units_out = "mV"
gain = 0.1

[[filters]]
type = "time delay"
name = "lag"
units_in = "mV"
units_out = "mV"
delay = 0.1

[[channels]]
name = "ex"
sample_rate = 4096.0
filters = ["dipole", "lag"]
normalization_frequency = 1.0
"#;

    #[test]
    fn test_json_survey() {
        let survey = SurveyFilters::from_json_str(SURVEY_JSON).unwrap();

        assert_eq!(survey.registry.len(), 2);
        let mut hx = survey.channel_response("HX").unwrap();
        assert_eq!(hx.names(), vec!["coil", "adc"]);
        hx.check_consistency_of_units().unwrap();
        assert_eq!(survey.channel("hx").unwrap().sample_rate, Hertz(256.0));

        let sensitivity = hx.compute_instrument_sensitivity(Some(Hertz(100.0))).unwrap();
        assert!(sensitivity > 0.0 && sensitivity < 1000.0);
    }

    #[test]
    fn test_toml_survey() {
        let survey = SurveyFilters::from_toml_str(SURVEY_TOML).unwrap();

        let ex = survey.channel_response("ex").unwrap();
        assert_eq!(ex.filters_list()[1].filter_type(), FilterType::TimeDelay);
        assert_eq!(ex.normalization_frequency(), Some(Hertz(1.0)));
        assert!((ex.total_delay().0 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let err = SurveyFilters::from_json_str(r#"{"filters": [], "chanels": []}"#).unwrap_err();
        assert!(matches!(err, MetadataError::Json(_)));
    }

    #[test]
    fn test_channel_with_unknown_filter_rejected() {
        let json = r#"{"filters": [], "channels": [{"name": "ey", "filters": ["missing"]}]}"#;
        let err = SurveyFilters::from_json_str(json).unwrap_err();
        assert!(matches!(err, MetadataError::MissingFilter { .. }));
    }

    #[test]
    fn test_unknown_channel() {
        let survey = SurveyFilters::from_json_str(SURVEY_JSON).unwrap();
        assert!(matches!(
            survey.channel_response("ez"),
            Err(MetadataError::MissingChannel(_))
        ));
    }
}
