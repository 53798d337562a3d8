//! Request filter configuration
//!
//! A [`FilterOption`] names a request attribute (usually a header) and lists
//! the values that make it match. The same shape is reused for exclusions,
//! inclusions and body-capture control; only the consumer differs.

use std::collections::HashMap;

use serde::Deserialize;

/// Matches a request when the named attribute satisfies any listed value
///
/// The attribute is the configured `header_name`, falling back to the map key
/// the option was registered under. The names `host`/`requesthost` and
/// `path`/`requestpath` are special-cased by the filter engine to read the
/// request host and path instead of a header.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterOption {
    /// Request attribute to evaluate
    pub header_name: String,

    /// Substring values to match
    pub contains: Vec<String>,

    /// End-of-string values to match
    pub ends_with: Vec<String>,

    /// Start-of-string values to match
    pub starts_with: Vec<String>,

    /// Regex patterns to match (compiled at startup)
    pub matches: Vec<String>,
}

impl FilterOption {
    /// Whether any filter list is populated
    pub fn enabled(&self) -> bool {
        !self.contains.is_empty()
            || !self.ends_with.is_empty()
            || !self.starts_with.is_empty()
            || !self.matches.is_empty()
    }
}

/// Filters that exclude matching requests from auditing
pub type Exclusions = HashMap<String, FilterOption>;

/// Filters that, when non-empty, restrict auditing to matching requests
pub type Inclusions = HashMap<String, FilterOption>;

/// Filters that restrict payload-contents capture to matching requests
pub type RequestBodyCaptures = HashMap<String, FilterOption>;

/// Filters that suppress payload-contents capture for matching requests
pub type RequestBodyIgnores = HashMap<String, FilterOption>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_option_disabled() {
        assert!(!FilterOption::default().enabled());
    }

    #[test]
    fn test_any_list_enables() {
        let option = FilterOption {
            contains: vec!["x".into()],
            ..Default::default()
        };
        assert!(option.enabled());

        let option = FilterOption {
            matches: vec!["^/api".into()],
            ..Default::default()
        };
        assert!(option.enabled());
    }
}
