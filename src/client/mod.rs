//! HTTP clients for the services the protocol depends on:
//!
//! - `catalog`: dataset metadata and datasource queries
//! - `capsule`: the key authority holding data keys and policies
//! - `confmanager`: certificate issuance for the task identity

pub mod capsule;
pub mod catalog;
pub mod confmanager;

use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

pub use capsule::{CapsuleClient, PolicyRequest};
pub use catalog::{CatalogClient, DataColumn, DataSource, DomainData};
pub use confmanager::ConfManagerClient;

use crate::error::{Error, Result};

/// CA bundle for mutual TLS, set by the runtime when TLS is required.
pub const TRUSTED_CA_FILE_ENV: &str = "TRUSTED_CA_FILE";
/// Client certificate for mutual TLS.
pub const CLIENT_CERT_FILE_ENV: &str = "CLIENT_CERT_FILE";
/// Client private key for mutual TLS.
pub const CLIENT_PRIVATE_KEY_FILE_ENV: &str = "CLIENT_PRIVATE_KEY_FILE";

/// Status header common to all service responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

pub(crate) const CODE_OK: i32 = 0;
pub(crate) const CODE_NOT_FOUND: i32 = 404;

/// Builds an HTTP client and the URL scheme to use with it.
///
/// When all three certificate environment variables are present the client
/// enforces mutual TLS and `https`; otherwise it is a plain `http` client.
pub(crate) fn build_client() -> Result<(reqwest::Client, &'static str)> {
    let ca = env::var(TRUSTED_CA_FILE_ENV);
    let cert = env::var(CLIENT_CERT_FILE_ENV);
    let key = env::var(CLIENT_PRIVATE_KEY_FILE_ENV);
    let (Ok(ca), Ok(cert), Ok(key)) = (ca, cert, key) else {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        return Ok((client, "http"));
    };

    let ca_pem = fs::read(&ca)?;
    let root = reqwest::Certificate::from_pem(&ca_pem)
        .map_err(|e| Error::Config(format!("invalid CA bundle {ca}: {e}")))?;

    // reqwest expects the client certificate and key in one PEM bundle
    let mut identity_pem = fs::read(&cert)?;
    identity_pem.extend_from_slice(&fs::read(&key)?);
    let identity = reqwest::Identity::from_pem(&identity_pem)
        .map_err(|e| Error::Config(format!("invalid client certificate {cert}: {e}")))?;

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .add_root_certificate(root)
        .identity(identity)
        .https_only(true)
        .build()
        .map_err(|e| Error::Config(format!("failed to build mutual TLS client: {e}")))?;
    Ok((client, "https"))
}

/// Maps a non-success HTTP response to a transport error with its body text.
pub(crate) async fn require_success(
    operation: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Transport(format!(
        "{operation} returned {status}: {body}"
    )))
}
