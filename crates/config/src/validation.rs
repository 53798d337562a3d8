//! Configuration validation
//!
//! Validates config consistency at startup, before anything is constructed:
//! - Required fields are present for the selected sink type
//! - Size strings parse
//! - Filter regexes compile
//! - Producer/channel settings are usable

use std::collections::HashMap;

use regex::Regex;

use crate::audit::SinkType;
use crate::error::{ConfigError, Result};
use crate::filters::FilterOption;
use crate::size::parse_size;
use crate::Config;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let audit = &config.audit;

    match audit.sink_type {
        SinkType::Http => {
            if audit.endpoint.is_empty() {
                return Err(ConfigError::MissingField { field: "endpoint" });
            }
            if audit.disk_store_path.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "disk_store_path",
                });
            }
            if audit.num_producers == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "num_producers",
                    message: "must be at least 1".into(),
                });
            }
        }
        SinkType::File => {
            if audit.endpoint.is_empty() {
                return Err(ConfigError::MissingField { field: "endpoint" });
            }
        }
        SinkType::Blackhole => {}
    }

    for (field, value) in [
        ("max_entity_length", &audit.max_entity_length),
        ("max_audit_length", &audit.max_audit_length),
        (
            "max_payload_contents_length",
            &audit.max_payload_contents_length,
        ),
    ] {
        parse_size(value).map_err(|e| ConfigError::InvalidValue {
            field,
            message: e.to_string(),
        })?;
    }

    for filters in [
        &audit.exclusions,
        &audit.inclusions,
        &audit.request_body_captures,
        &audit.request_body_ignores,
    ] {
        validate_filters(filters)?;
    }

    Ok(())
}

/// Check that every `matches` pattern compiles
fn validate_filters(filters: &HashMap<String, FilterOption>) -> Result<()> {
    for (name, option) in filters {
        for pattern in &option.matches {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                filter: name.clone(),
                pattern: pattern.clone(),
                source: e,
            })?;
        }
    }
    Ok(())
}
