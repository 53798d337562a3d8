//! Payload obfuscation
//!
//! Masks the values of configured fields in captured request bodies before
//! they enter an audit event. Two body shapes are understood:
//!
//! - `application/x-www-form-urlencoded` - parameter values are replaced,
//!   preserving parameter order and delimiters.
//! - `application/json` - property values are rewritten in place so the
//!   original whitespace and key order survive; non-string values become
//!   the quoted mask value.
//!
//! Masking is a courtesy, not a guarantee: a body that fails to parse as
//! its declared content type passes through unmodified.

use regex::Regex;

#[cfg(test)]
#[path = "obfuscate_test.rs"]
mod obfuscate_test;

/// Compiled masking rules
#[derive(Debug, Clone, Default)]
pub struct AuditObfuscation {
    mask_fields: Vec<String>,
    mask_value: String,
    json_patterns: Vec<Regex>,
}

impl AuditObfuscation {
    /// Build masking rules for the given fields
    ///
    /// Field names are compared case-sensitively against form parameter
    /// names and JSON property names.
    pub fn new(mask_fields: &[String], mask_value: impl Into<String>) -> Self {
        let json_patterns = mask_fields
            .iter()
            .map(|field| {
                // "field" <ws> : <ws> then a string literal or a bare scalar
                let pattern = format!(
                    r#"("{}"\s*:\s*)("(?:\\.|[^"\\])*"|[^\s,}}\]]+)"#,
                    regex::escape(field)
                );
                Regex::new(&pattern).expect("escaped field name always compiles")
            })
            .collect();

        Self {
            mask_fields: mask_fields.to_vec(),
            mask_value: mask_value.into(),
            json_patterns,
        }
    }

    /// Whether any fields are configured
    pub fn enabled(&self) -> bool {
        !self.mask_fields.is_empty()
    }

    /// The configured replacement value
    pub fn mask_value(&self) -> &str {
        &self.mask_value
    }

    /// Mask a body according to its content type
    ///
    /// Returns `None` when no masker applies (unknown content type, or no
    /// fields configured); the caller keeps the original body.
    pub fn apply(&self, content_type: &str, body: &str) -> Option<String> {
        if !self.enabled() {
            return None;
        }
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media_type.as_str() {
            "application/x-www-form-urlencoded" => Some(self.mask_form(body)),
            "application/json" => Some(self.mask_json(body)),
            _ => None,
        }
    }

    /// Mask matching parameters in a form-encoded body
    ///
    /// Works on the raw text so parameter order and delimiter style are
    /// preserved exactly.
    pub fn mask_form(&self, body: &str) -> String {
        body.split('&')
            .map(|param| match param.split_once('=') {
                Some((name, _)) if self.mask_fields.iter().any(|f| f == name) => {
                    format!("{name}={}", self.mask_value)
                }
                _ => param.to_string(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Mask matching properties in a JSON body
    ///
    /// The document is validated first; unparseable input passes through
    /// unmodified. Replacement happens textually so formatting survives.
    pub fn mask_json(&self, body: &str) -> String {
        if serde_json::from_str::<serde::de::IgnoredAny>(body).is_err() {
            return body.to_string();
        }

        let mut masked = body.to_string();
        for pattern in &self.json_patterns {
            masked = pattern
                .replace_all(&masked, |caps: &regex::Captures<'_>| {
                    format!("{}\"{}\"", &caps[1], self.mask_value)
                })
                .into_owned();
        }
        masked
    }
}
