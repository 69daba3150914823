//! Shared state of the passive endpoint.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::client::CatalogClient;

/// State shared by all routes of the passive endpoint.
#[derive(Clone)]
pub struct AppState {
    /// Catalog of the party this endpoint runs for.
    pub catalog: Arc<CatalogClient>,
    /// Directory incoming files are staged in before reaching a datasource.
    pub staging_dir: PathBuf,
    /// Trigger for the graceful shutdown, taken by the first request.
    pub shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(
        catalog: CatalogClient,
        staging_dir: PathBuf,
        shutdown: oneshot::Sender<()>,
    ) -> Self {
        AppState {
            catalog: Arc::new(catalog),
            staging_dir,
            shutdown: Arc::new(Mutex::new(Some(shutdown))),
        }
    }
}
