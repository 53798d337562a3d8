//! Size strings with SI suffixes
//!
//! Configuration sizes are written as strings so operators can use units:
//! `K`/`k` (×1000), `Ki` (×1024), `M` (×1 000 000), `Mi` (×1 048 576),
//! `G`/`Gi` likewise. A trailing `B` is tolerated (`32KiB` == `32Ki`).

use crate::error::{ConfigError, Result};

#[cfg(test)]
#[path = "size_test.rs"]
mod size_test;

/// Parse a size string into bytes
///
/// A bare number means bytes. Whitespace between the number and the unit is
/// allowed. Fractions are not.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSize`] for empty input, unknown units or
/// non-numeric values.
pub fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "empty size"));
    }

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return Err(invalid(input, "no leading number"));
    }

    let value: u64 = trimmed[..digits_end]
        .parse()
        .map_err(|_| invalid(input, "number out of range"))?;

    let unit = trimmed[digits_end..].trim_start();
    let unit = unit.strip_suffix('B').unwrap_or(unit);
    let multiplier: u64 = match unit {
        "" => 1,
        "k" | "K" => 1000,
        "Ki" => 1024,
        "M" => 1_000_000,
        "Mi" => 1024 * 1024,
        "G" => 1_000_000_000,
        "Gi" => 1024 * 1024 * 1024,
        _ => return Err(invalid(input, "unknown unit")),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid(input, "size overflows"))
}

fn invalid(input: &str, message: &str) -> ConfigError {
    ConfigError::InvalidSize {
        value: input.to_string(),
        message: message.to_string(),
    }
}
