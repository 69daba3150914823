//! `/get_domain_data` route: serves the metadata record of a dataset.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::{reject, AppState, UriRequest};
use crate::client::DomainData;
use crate::uri;

pub(crate) async fn handle_get_domain_data(
    State(state): State<AppState>,
    Json(request): Json<UriRequest>,
) -> Result<Json<DomainData>, (StatusCode, String)> {
    let id = uri::domain_data_id(&request.uri).map_err(reject)?;
    let record = state.catalog.get_domain_data(&id).await.map_err(reject)?;
    Ok(Json(record))
}
