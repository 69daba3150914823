//! Passive transfer endpoint.
//!
//! The passive party of a transfer serves this HTTP service until the
//! active party tells it to shut down:
//!
//! - `POST /upload`: receive an encrypted dataset and register it
//! - `POST /download`: stream a stored dataset back to the peer
//! - `POST /get_domain_data`: serve a dataset's metadata record
//! - `POST /shutdown`: stop the endpoint once the transfer is complete

mod domain_data;
mod download;
mod state;
mod upload;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub use state::AppState;

use crate::client::CatalogClient;
use crate::error::Result;

/// Request body of the `/download` and `/get_domain_data` routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct UriRequest {
    pub uri: String,
}

/// Builds the endpoint router. Dataset uploads may be arbitrarily large, so
/// the default body limit is lifted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload::handle_upload))
        .route("/download", post(download::handle_download))
        .route(
            "/get_domain_data",
            post(domain_data::handle_get_domain_data),
        )
        .route("/shutdown", post(handle_shutdown))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Serves the passive endpoint on `port` until a shutdown request arrives.
pub async fn serve(port: u16, catalog_endpoint: &str) -> Result<()> {
    let catalog = CatalogClient::from_env(catalog_endpoint)?;
    let staging_dir = std::env::temp_dir().join("tee-dm-staging");
    tokio::fs::create_dir_all(&staging_dir).await?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let state = AppState::new(catalog, staging_dir, shutdown_tx);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Transfer endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;
    info!("Transfer endpoint stopped");
    Ok(())
}

// --- Handlers ---

async fn handle_shutdown(State(state): State<AppState>) -> (StatusCode, String) {
    let Ok(mut sender) = state.shutdown.lock() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "shutdown state unavailable".into(),
        );
    };
    match sender.take() {
        Some(tx) => {
            info!("Shutdown requested by peer");
            let _ = tx.send(());
            (StatusCode::OK, "shutting down".into())
        }
        None => (
            StatusCode::BAD_REQUEST,
            "shutdown already requested".into(),
        ),
    }
}

/// Maps an internal error onto a client-visible rejection.
pub(crate) fn reject(err: crate::error::Error) -> (StatusCode, String) {
    error!("Request failed: {err}");
    (StatusCode::BAD_REQUEST, err.to_string())
}
