//! Header-to-field mapping configuration
//!
//! Declares audit event fields whose values are sourced from request or
//! response headers. The outer key names the event section the fields land
//! in (`requestHeaders` or `responseHeaders`); the inner map is
//! field name → header name.
//!
//! ```toml
//! [audit.header_mappings.requestHeaders]
//! trackingId = "x-tracking-id"
//!
//! [audit.header_mappings.responseHeaders]
//! cacheOutcome = "x-cache"
//! ```

use std::collections::HashMap;

/// Field name → header name, for one event section
pub type FieldHeaderMapping = HashMap<String, String>;

/// Event section → field mappings
pub type HeaderMappings = HashMap<String, FieldHeaderMapping>;

/// Section name for fields sourced from request headers
pub const REQUEST_HEADERS_SECTION: &str = "requestHeaders";

/// Section name for fields sourced from response headers
pub const RESPONSE_HEADERS_SECTION: &str = "responseHeaders";
