//! Strict construction of filters from loosely-typed metadata values.
//!
//! Every record must carry a recognized `type` tag and only the fields that
//! variant accepts. Each record is also checked against its stage
//! invariants. Failures are collected across the whole list and reported
//! together; no partial list is ever returned.

use crate::error::{MetadataError, MetadataResult};
use lib_filters::{Filter, FilterStage, FilterType};
use serde_json::Value;
use std::sync::Arc;

/// Build a single filter from one metadata record.
pub fn build_filter(value: &Value) -> Result<Filter, String> {
    let record = value
        .as_object()
        .ok_or_else(|| format!("expected a filter record, got {}", type_name(value)))?;

    let tag = record
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'type' tag".to_string())?;
    let filter_type = FilterType::from_tag(tag).ok_or_else(|| {
        let known: Vec<&str> = FilterType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown filter type '{}', expected one of {}", tag, known.join(", "))
    })?;

    let accepted = Filter::fields(filter_type);
    let unknown: Vec<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|key| !accepted.contains(key))
        .collect();
    if !unknown.is_empty() {
        return Err(format!(
            "unknown field(s) for {}: {}",
            filter_type,
            unknown.join(", ")
        ));
    }

    let mut normalized = record.clone();
    normalized.insert("type".into(), Value::String(filter_type.as_str().into()));
    let filter: Filter =
        serde_json::from_value(Value::Object(normalized)).map_err(|e| e.to_string())?;
    filter.validate().map_err(|e| e.to_string())?;

    Ok(filter)
}

/// Build an ordered filter list.
///
/// `null` yields an empty list. Anything other than a sequence, or a
/// sequence with any invalid element, is rejected as a whole.
pub fn build_filters_list(value: &Value) -> MetadataResult<Vec<Arc<Filter>>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(MetadataError::InvalidFilterList(format!(
                "expected a sequence of filters, got {}",
                type_name(other)
            )))
        }
    };

    let mut filters = Vec::with_capacity(items.len());
    let mut failures = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match build_filter(item) {
            Ok(filter) => filters.push(Arc::new(filter)),
            Err(message) => {
                let label = item
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|name| format!("item {} ('{}')", index, name))
                    .unwrap_or_else(|| format!("item {}", index));
                failures.push(format!("{}: {}", label, message));
            }
        }
    }

    if !failures.is_empty() {
        return Err(MetadataError::InvalidFilterList(failures.join("; ")));
    }

    tracing::debug!("Built {} filters", filters.len());
    Ok(filters)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::units::Seconds;
    use serde_json::json;

    #[test]
    fn test_null_is_empty() {
        assert!(build_filters_list(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_mapping_rejected() {
        let err = build_filters_list(&json!({"type": "coefficient"})).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidFilterList(_)));
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_valid_list_in_order() {
        let value = json!([
            {"type": "coefficient", "name": "adc", "units_in": "V", "units_out": "count", "gain": 1e6},
            {"type": "time delay", "name": "lag", "units_in": "count", "units_out": "count", "delay": 0.25}
        ]);
        let filters = build_filters_list(&value).unwrap();

        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name(), "adc");
        assert_eq!(filters[1].delay(), Seconds(0.25));
    }

    #[test]
    fn test_all_failures_reported_together() {
        let value = json!([
            {"type": "coefficient", "name": "ok", "units_in": "V", "units_out": "count"},
            {"type": "butterworth", "name": "bw", "units_in": "V", "units_out": "V"},
            {"type": "coefficient", "name": "typo", "units_in": "V", "units_out": "count", "gian": 2.0},
            "not a filter"
        ]);
        let err = build_filters_list(&value).unwrap_err().to_string();

        assert!(err.contains("item 1 ('bw')"));
        assert!(err.contains("unknown filter type 'butterworth'"));
        assert!(err.contains("item 2 ('typo')"));
        assert!(err.contains("gian"));
        assert!(err.contains("item 3: expected a filter record"));
        assert!(!err.contains("item 0"));
    }

    #[test]
    fn test_stage_invariants_checked() {
        let value = json!([{
            "type": "frequency_response_table",
            "name": "cal",
            "units_in": "nT",
            "units_out": "mV",
            "frequencies": [1.0],
            "amplitudes": [1.0],
            "phases": [0.0]
        }]);
        let err = build_filters_list(&value).unwrap_err().to_string();
        assert!(err.contains("at least two rows"));
    }
}
