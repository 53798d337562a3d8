//! Process-wide audit specification
//!
//! The compiled, immutable view of the audit configuration that event
//! population consults: header mappings, masking rules, and the four
//! filter sets. Built once at startup.

use tapwire_config::{AuditConfig, HeaderMappings};

use crate::context::RequestContext;
use crate::error::Result;
use crate::filter::FilterSet;
use crate::obfuscate::AuditObfuscation;

/// Compiled audit configuration
#[derive(Debug, Clone, Default)]
pub struct AuditSpecification {
    /// Section → field → header name mappings
    pub header_mappings: HeaderMappings,
    /// Payload masking rules
    pub obfuscation: AuditObfuscation,
    /// When non-empty, only matching requests are audited
    pub inclusions: FilterSet,
    /// Matching requests are never audited
    pub exclusions: FilterSet,
    /// When non-empty, payload contents are captured only for matches
    pub body_captures: FilterSet,
    /// Matching requests never have payload contents captured
    pub body_ignores: FilterSet,
}

impl AuditSpecification {
    /// Compile the specification from configuration
    ///
    /// # Errors
    ///
    /// Fails when a filter `matches` pattern does not compile.
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Ok(Self {
            header_mappings: config.header_mappings.clone(),
            obfuscation: AuditObfuscation::new(&config.mask_fields, &config.mask_value),
            inclusions: FilterSet::compile(&config.inclusions)?,
            exclusions: FilterSet::compile(&config.exclusions)?,
            body_captures: FilterSet::compile(&config.request_body_captures)?,
            body_ignores: FilterSet::compile(&config.request_body_ignores)?,
        })
    }

    /// Whether the request should be audited at all
    ///
    /// A request is skipped when any exclusion matches, or when inclusions
    /// are configured and none match.
    pub fn audits(&self, ctx: &RequestContext) -> bool {
        if self.exclusions.any_match(ctx) {
            return false;
        }
        self.inclusions.is_empty() || self.inclusions.any_match(ctx)
    }

    /// Whether payload contents may be recorded for the request
    pub fn captures_body(&self, ctx: &RequestContext) -> bool {
        if self.body_ignores.any_match(ctx) {
            return false;
        }
        self.body_captures.is_empty() || self.body_captures.any_match(ctx)
    }
}
