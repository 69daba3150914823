//! `/download` route: streams a stored dataset file back to the peer.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::info;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::{reject, AppState, UriRequest};
use crate::uri;

pub(crate) async fn handle_download(
    State(state): State<AppState>,
    Json(request): Json<UriRequest>,
) -> Result<Response, (StatusCode, String)> {
    let id = uri::domain_data_id(&request.uri).map_err(reject)?;
    let record = state.catalog.get_domain_data(&id).await.map_err(reject)?;
    let datasource = state
        .catalog
        .get_domain_datasource(&record.datasource_id)
        .await
        .map_err(reject)?;
    let path = datasource
        .localfs_root()
        .map_err(reject)?
        .join(&record.relative_uri);
    let file = File::open(&path).await.map_err(|e| {
        (
            StatusCode::NOT_FOUND,
            format!("dataset file {} unavailable: {e}", path.display()),
        )
    })?;
    info!("Serving {} for '{}'", path.display(), request.uri);
    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}
