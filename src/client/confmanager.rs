//! Config manager client.
//!
//! The config manager issues the certificate chain and private key a task
//! uses as its identity. Both come back base64 wrapped and are unpacked to
//! PEM strings here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::info;
use serde::{Deserialize, Serialize};

use super::{build_client, require_success, Status, CODE_OK};
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct GenerateCertificateRequest<'a> {
    common_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateCertificateResponse {
    status: Status,
    #[serde(default)]
    cert_chain: Vec<String>,
    #[serde(default)]
    key: String,
}

/// Client for the config manager service.
pub struct ConfManagerClient {
    base: String,
    client: reqwest::Client,
}

impl ConfManagerClient {
    /// Connects to the config manager at `endpoint`, enabling mutual TLS
    /// when the certificate environment variables are set.
    pub fn from_env(endpoint: &str) -> Result<Self> {
        let (client, scheme) = build_client()?;
        Ok(ConfManagerClient {
            base: format!("{scheme}://{endpoint}/api/v1/cm"),
            client,
        })
    }

    /// Requests a certificate chain and matching private key for
    /// `common_name`. Returns PEM strings, chain first.
    pub async fn generate_certificate(&self, common_name: &str) -> Result<(Vec<String>, String)> {
        let url = format!("{}/certificate/generate", self.base);
        info!("Requesting certificate for '{common_name}'");
        let response = self
            .client
            .post(&url)
            .json(&GenerateCertificateRequest { common_name })
            .send()
            .await?;
        let response = require_success("certificate/generate", response).await?;
        let payload: GenerateCertificateResponse = response.json().await.map_err(|e| {
            Error::Transport(format!("malformed config manager response: {e}"))
        })?;
        if payload.status.code != CODE_OK {
            return Err(Error::Config(format!(
                "config manager refused certificate generation: code {}: {}",
                payload.status.code, payload.status.message
            )));
        }
        let chain = payload
            .cert_chain
            .iter()
            .map(|cert| decode_pem_field(cert))
            .collect::<Result<Vec<_>>>()?;
        if chain.is_empty() {
            return Err(Error::Config(
                "config manager returned an empty certificate chain".into(),
            ));
        }
        let key = decode_pem_field(&payload.key)?;
        Ok((chain, key))
    }
}

fn decode_pem_field(encoded: &str) -> Result<String> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| Error::Config(format!("config manager returned invalid base64: {e}")))?;
    String::from_utf8(raw)
        .map_err(|e| Error::Config(format!("config manager returned non-utf8 PEM: {e}")))
}
