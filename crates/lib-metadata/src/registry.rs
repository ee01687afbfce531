//! Survey-level filter registry and per-channel filter references.

use crate::error::{MetadataError, MetadataResult};
use lib_filters::{ChannelResponse, Filter, FilterStage};
use lib_types::units::Hertz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

fn default_sample_rate() -> Hertz {
    Hertz(1.0)
}

/// A channel's ordered list of filter names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelFilters {
    /// Channel component, e.g. `hx` or `ey`.
    pub name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: Hertz,

    /// Filter names in application order.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Pinned normalization frequency for this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_frequency: Option<Hertz>,
}

impl ChannelFilters {
    pub fn new(name: impl Into<String>, sample_rate: Hertz, filters: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            filters,
            normalization_frequency: None,
        }
    }
}

/// Filters shared by all channels of a survey, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<Filter>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate names.
    pub fn from_filters<I>(filters: I) -> MetadataResult<Self>
    where
        I: IntoIterator<Item = Arc<Filter>>,
    {
        let mut registry = Self::new();
        for filter in filters {
            registry.insert(filter)?;
        }
        Ok(registry)
    }

    /// Add a filter under its own name.
    pub fn insert(&mut self, filter: Arc<Filter>) -> MetadataResult<()> {
        let name = filter.name().to_string();
        if self.filters.contains_key(&name) {
            return Err(MetadataError::DuplicateFilter(name));
        }
        self.filters.insert(name, filter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Filter>> {
        self.filters.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Filter>> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Resolve a channel's filter names into a response chain.
    pub fn channel_response(&self, channel: &ChannelFilters) -> MetadataResult<ChannelResponse> {
        let filters = channel
            .filters
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| MetadataError::MissingFilter {
                    channel: channel.name.clone(),
                    filter: name.clone(),
                })
            })
            .collect::<MetadataResult<Vec<_>>>()?;

        let mut response = ChannelResponse::with_filters(filters);
        response.set_normalization_frequency(channel.normalization_frequency);
        tracing::debug!(
            "Channel '{}' resolved to {} filters",
            channel.name,
            response.len()
        );
        Ok(response)
    }
}
