//! Request filter engine
//!
//! Compiles [`FilterOption`](tapwire_config::FilterOption) configuration
//! into matchers over a [`RequestContext`]. Used for exclusion, inclusion
//! and body-capture decisions; the decision is pure in (request, filters).

use std::collections::HashMap;

use regex::Regex;
use tapwire_config::FilterOption;

use crate::context::RequestContext;
use crate::error::{EventError, Result};

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;

/// Where a filter reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueSource {
    /// The request host
    Host,
    /// The request path
    Path,
    /// A named request header
    Header,
}

/// A single compiled filter
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    source: ValueSource,
    header: String,
    contains: Vec<String>,
    ends_with: Vec<String>,
    starts_with: Vec<String>,
    patterns: Vec<Regex>,
}

impl CompiledFilter {
    /// Compile one filter option
    ///
    /// `name` is the key the option was registered under; it doubles as the
    /// attribute name when `header_name` is not set.
    pub fn compile(name: &str, option: &FilterOption) -> Result<Self> {
        let attribute = if option.header_name.is_empty() {
            name
        } else {
            option.header_name.as_str()
        }
        .to_ascii_lowercase();

        let source = match attribute.as_str() {
            "host" | "requesthost" => ValueSource::Host,
            "path" | "requestpath" => ValueSource::Path,
            _ => ValueSource::Header,
        };

        let patterns = option
            .matches
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| EventError::InvalidPattern {
                    filter: name.to_string(),
                    pattern: pattern.clone(),
                    source: e,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source,
            header: attribute,
            contains: option.contains.clone(),
            ends_with: option.ends_with.clone(),
            starts_with: option.starts_with.clone(),
            patterns,
        })
    }

    /// Whether any value list is populated
    pub fn enabled(&self) -> bool {
        !self.contains.is_empty()
            || !self.ends_with.is_empty()
            || !self.starts_with.is_empty()
            || !self.patterns.is_empty()
    }

    /// Whether the request satisfies this filter
    ///
    /// Empty attribute values never match.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let value = match self.source {
            ValueSource::Host => ctx.host.as_str(),
            ValueSource::Path => ctx.path.as_str(),
            ValueSource::Header => ctx.header(&self.header).unwrap_or_default(),
        };
        if value.is_empty() {
            return false;
        }

        self.starts_with.iter().any(|p| value.starts_with(p))
            || self.ends_with.iter().any(|s| value.ends_with(s))
            || self.contains.iter().any(|s| value.contains(s))
            || self.patterns.iter().any(|re| re.is_match(value))
    }
}

/// A set of compiled filters
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<CompiledFilter>,
}

impl FilterSet {
    /// Compile a configured filter map
    ///
    /// Disabled options (no value lists) are kept out of the set entirely,
    /// so an all-disabled configuration behaves as an empty one.
    pub fn compile(options: &HashMap<String, FilterOption>) -> Result<Self> {
        let mut filters = Vec::with_capacity(options.len());
        for (name, option) in options {
            let filter = CompiledFilter::compile(name, option)?;
            if filter.enabled() {
                filters.push(filter);
            }
        }
        Ok(Self { filters })
    }

    /// Whether the set has no enabled filters
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Whether any filter in the set matches the request
    pub fn any_match(&self, ctx: &RequestContext) -> bool {
        self.filters.iter().any(|f| f.matches(ctx))
    }
}
