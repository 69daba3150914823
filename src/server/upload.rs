//! `/upload` route: receives an encrypted dataset and registers it.
//!
//! The multipart body carries three fields: `file` (the encrypted bytes),
//! `store_path` (the output URI naming the target id, relative path and
//! datasource) and `domain_data` (the source metadata record as JSON). The
//! file is staged first, then copied into the datasource and registered
//! with the local catalog.

use std::path::PathBuf;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use log::{info, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{reject, AppState};
use crate::client::DomainData;
use crate::uri;

pub(crate) async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, (StatusCode, String)> {
    let mut store_path: Option<String> = None;
    let mut staged: Option<PathBuf> = None;
    let mut domain_data: Option<DomainData> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "store_path" => {
                store_path = Some(field.text().await.map_err(bad_multipart)?);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("dataset").to_string();
                let path = state
                    .staging_dir
                    .join(format!("{}-{file_name}", Uuid::new_v4()));
                let mut file = fs::File::create(&path).await.map_err(|e| reject(e.into()))?;
                while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                    file.write_all(&chunk).await.map_err(|e| reject(e.into()))?;
                }
                file.flush().await.map_err(|e| reject(e.into()))?;
                staged = Some(path);
            }
            "domain_data" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                domain_data = Some(serde_json::from_str(&raw).map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("invalid domain_data field: {e}"),
                    )
                })?);
            }
            other => warn!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    let store_path = store_path.ok_or_else(|| missing("store_path"))?;
    let staged = staged.ok_or_else(|| missing("file"))?;
    let domain_data = domain_data.ok_or_else(|| missing("domain_data"))?;

    let target = uri::parse_output_uri(&store_path).map_err(reject)?;
    let datasource = state
        .catalog
        .get_domain_datasource(&target.datasource_id)
        .await
        .map_err(reject)?;
    let dest = datasource
        .localfs_root()
        .map_err(reject)?
        .join(&target.relative_uri);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(|e| reject(e.into()))?;
    }
    let bytes = fs::copy(&staged, &dest).await.map_err(|e| reject(e.into()))?;
    fs::remove_file(&staged).await.map_err(|e| reject(e.into()))?;
    info!("Stored {bytes} byte upload at {}", dest.display());

    state
        .catalog
        .create_domain_data(
            &target.domain_data_id,
            &target.relative_uri,
            &target.datasource_id,
            &domain_data,
        )
        .await
        .map_err(reject)?;
    info!("Registered dataset '{}'", target.domain_data_id);
    Ok("upload complete".into())
}

fn bad_multipart(err: MultipartError) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("malformed multipart body: {err}"),
    )
}

fn missing(field: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("missing multipart field '{field}'"),
    )
}
