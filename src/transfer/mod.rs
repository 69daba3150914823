//! Active-side transfer flows.
//!
//! The active party of a two-party operation drives the whole exchange. It
//! talks to its own catalog, the key authority and the peer's transfer
//! endpoint. Uploads seal the dataset before any byte leaves the party and
//! downloads unseal only after the bytes have arrived, so nothing between
//! the two parties ever sees plaintext.

mod download;
mod upload;

pub use download::download;
pub use upload::upload;

use crate::client::{CapsuleClient, CatalogClient};
use crate::config::TaskConfig;
use crate::identity::PartyIdentity;
use crate::retry::RetryPolicy;

/// Everything an active-side flow needs.
pub struct TransferContext<'a> {
    pub config: &'a TaskConfig,
    pub identity: &'a PartyIdentity,
    pub catalog: CatalogClient,
    pub capsule: CapsuleClient,
    pub retry_policy: RetryPolicy,
}
