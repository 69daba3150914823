//! Client for the peer party's transfer endpoint.
//!
//! The passive side of a transfer serves four routes: `/upload`,
//! `/download`, `/get_domain_data` and `/shutdown`. Uploads and downloads
//! stream file contents and are retried, since the peer endpoint may still
//! be starting when the active side first connects. Shutdown is a single
//! attempt.

use std::path::Path;

use futures::StreamExt;
use log::info;
use reqwest::multipart::{Form, Part};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::client::catalog::DomainData;
use crate::client::require_success;
use crate::error::{Error, Result};
use crate::retry::{retry, RetryPolicy};
use crate::server::UriRequest;

pub struct PeerClient {
    base: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl PeerClient {
    pub fn new(endpoint: &str, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(PeerClient {
            base: format!("http://{endpoint}"),
            client,
            policy,
        })
    }

    /// Sends an encrypted file to the peer, telling it to store the bytes
    /// under `store_path` and register them from the `domain_data` record.
    /// Each attempt re-streams the file from disk.
    pub async fn upload_file(
        &self,
        file: &Path,
        store_path: &str,
        domain_data: &DomainData,
    ) -> Result<()> {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("dataset")
            .to_string();
        let metadata = serde_json::to_string(domain_data)
            .map_err(|e| Error::Input(format!("unserializable dataset metadata: {e}")))?;
        let url = format!("{}/upload", self.base);

        let client = &self.client;
        let url_ref = &url;
        let file_name_ref = &file_name;
        let metadata_ref = &metadata;
        retry(&self.policy, "peer upload", || async move {
            let source = File::open(file).await?;
            let part = Part::stream(reqwest::Body::wrap_stream(ReaderStream::new(source)))
                .file_name(file_name_ref.clone())
                .mime_str("application/octet-stream")?;
            let form = Form::new()
                .part("file", part)
                .text("store_path", store_path.to_string())
                .text("domain_data", metadata_ref.clone());
            let response = client.post(url_ref).multipart(form).send().await?;
            require_success("peer upload", response).await?;
            Ok(())
        })
        .await?;
        info!("Uploaded {} to {url}", file.display());
        Ok(())
    }

    /// Streams the encrypted dataset addressed by `uri` into `dest`. Each
    /// attempt truncates whatever a failed attempt left behind.
    pub async fn download_file(&self, uri: &str, dest: &Path) -> Result<()> {
        let url = format!("{}/download", self.base);
        let client = &self.client;
        let url_ref = &url;
        retry(&self.policy, "peer download", || async move {
            let request = UriRequest {
                uri: uri.to_string(),
            };
            let response = client.post(url_ref).json(&request).send().await?;
            let response = require_success("peer download", response).await?;
            let mut file = File::create(dest).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk
                    .map_err(|e| Error::Transport(format!("download stream interrupted: {e}")))?;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        })
        .await?;
        info!("Downloaded '{uri}' to {}", dest.display());
        Ok(())
    }

    /// Fetches the metadata record the peer's catalog holds for `uri`.
    pub async fn get_domain_data(&self, uri: &str) -> Result<DomainData> {
        let url = format!("{}/get_domain_data", self.base);
        let client = &self.client;
        let url_ref = &url;
        retry(&self.policy, "peer metadata fetch", || async move {
            let request = UriRequest {
                uri: uri.to_string(),
            };
            let response = client.post(url_ref).json(&request).send().await?;
            let response = require_success("peer metadata fetch", response).await?;
            response
                .json::<DomainData>()
                .await
                .map_err(|e| Error::Transport(format!("malformed metadata response: {e}")))
        })
        .await
    }

    /// Tells the peer endpoint to shut down. Single attempt, never retried.
    pub async fn shutdown(&self) -> Result<()> {
        let url = format!("{}/shutdown", self.base);
        let response = self.client.post(&url).send().await?;
        require_success("peer shutdown", response).await?;
        info!("Peer endpoint acknowledged shutdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::Router;
    use tokio::net::TcpListener;

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            multiplier: 1,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("127.0.0.1:{}", addr.port())
    }

    #[derive(Clone, Default)]
    struct UploadLog {
        attempts: Arc<Mutex<Vec<(Vec<u8>, String, String)>>>,
    }

    /// Consumes the whole form, then fails the first attempt.
    async fn flaky_upload(
        State(log): State<UploadLog>,
        mut multipart: Multipart,
    ) -> (StatusCode, &'static str) {
        let mut file_bytes = Vec::new();
        let mut store_path = String::new();
        let mut metadata = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => file_bytes = field.bytes().await.unwrap().to_vec(),
                "store_path" => store_path = field.text().await.unwrap(),
                "domain_data" => metadata = field.text().await.unwrap(),
                _ => {}
            }
        }
        let mut attempts = log.attempts.lock().unwrap();
        attempts.push((file_bytes, store_path, metadata));
        if attempts.len() == 1 {
            (StatusCode::INTERNAL_SERVER_ERROR, "not ready")
        } else {
            (StatusCode::OK, "stored")
        }
    }

    fn clean_body() -> Vec<u8> {
        (0..10_000).map(|i| (i % 97) as u8).collect()
    }

    /// First attempt drops the connection mid-body, second serves cleanly.
    async fn flaky_download(State(attempts): State<Arc<AtomicU32>>) -> Response {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            let chunks: Vec<io::Result<Vec<u8>>> = vec![
                Ok(vec![0xA7; 96 * 1024]),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "wire dropped")),
            ];
            Body::from_stream(futures::stream::iter(chunks)).into_response()
        } else {
            clean_body().into_response()
        }
    }

    async fn refuse_shutdown(State(attempts): State<Arc<AtomicU32>>) -> (StatusCode, &'static str) {
        attempts.fetch_add(1, Ordering::SeqCst);
        (StatusCode::INTERNAL_SERVER_ERROR, "busy")
    }

    #[tokio::test]
    async fn test_upload_rebuilds_form_for_each_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("payload.bin");
        let payload: Vec<u8> = (0..200_000).map(|i| (i % 241) as u8).collect();
        std::fs::write(&source, &payload).unwrap();

        let log = UploadLog::default();
        let endpoint = spawn(
            Router::new()
                .route("/upload", post(flaky_upload))
                .with_state(log.clone()),
        )
        .await;

        let peer = PeerClient::new(&endpoint, fast_policy()).unwrap();
        let record = DomainData {
            domaindata_id: "peer-data".into(),
            ..Default::default()
        };
        peer.upload_file(&source, "received/payload.bin", &record)
            .await
            .unwrap();

        // both the failed attempt and the successful one carried the full
        // form, so the file was re-opened and re-streamed in between
        let attempts = log.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        for (bytes, store_path, metadata) in attempts.iter() {
            assert_eq!(bytes, &payload);
            assert_eq!(store_path, "received/payload.bin");
            let parsed: DomainData = serde_json::from_str(metadata).unwrap();
            assert_eq!(parsed.domaindata_id, "peer-data");
        }
    }

    #[tokio::test]
    async fn test_download_truncates_leftover_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("fetched.bin");
        // stale content longer than the final payload must not survive
        std::fs::write(&dest, vec![0x5A; 64 * 1024]).unwrap();

        let attempts = Arc::new(AtomicU32::new(0));
        let endpoint = spawn(
            Router::new()
                .route("/download", post(flaky_download))
                .with_state(Arc::clone(&attempts)),
        )
        .await;

        let peer = PeerClient::new(&endpoint, fast_policy()).unwrap();
        peer.download_file("dm://input?id=abc", &dest).await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::read(&dest).unwrap(), clean_body());
    }

    #[tokio::test]
    async fn test_shutdown_is_single_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let endpoint = spawn(
            Router::new()
                .route("/shutdown", post(refuse_shutdown))
                .with_state(Arc::clone(&attempts)),
        )
        .await;

        let peer = PeerClient::new(&endpoint, fast_policy()).unwrap();
        let err = peer.shutdown().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
