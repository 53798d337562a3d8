//! Delivery HTTP client
//!
//! Builds the `reqwest` client shared by all producers. The client fails
//! fast: the total timeout (1 second unless configured otherwise) keeps
//! the publish loop moving when the receiver is slow, at the cost of
//! dropping events it cannot deliver in time.

use std::env;
use std::fs;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, SinkError};

/// Environment variable naming a PEM root CA for the delivery client
pub const CERTIFICATE_PATH_ENV: &str = "CERTIFICATEPATH";

/// Default total per-request timeout
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Build the delivery client
///
/// With `CERTIFICATEPATH` set, the named PEM file becomes the client's
/// root CA. Absent or empty, a plain client is built.
///
/// # Errors
///
/// Fails when the certificate file cannot be read or parsed, or the
/// client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let cert_path = env::var(CERTIFICATE_PATH_ENV).unwrap_or_default();

    let builder = reqwest::Client::builder().timeout(timeout);
    let builder = if cert_path.is_empty() {
        warn!("no CERTIFICATEPATH env var; using plain http client");
        builder
    } else {
        let pem = fs::read(&cert_path).map_err(|e| SinkError::Certificate {
            path: cert_path.clone(),
            message: e.to_string(),
        })?;
        let certificate =
            reqwest::Certificate::from_pem(&pem).map_err(|e| SinkError::Certificate {
                path: cert_path.clone(),
                message: e.to_string(),
            })?;
        info!(path = %cert_path, "loaded delivery root certificate");
        builder.add_root_certificate(certificate)
    };

    Ok(builder.build()?)
}
