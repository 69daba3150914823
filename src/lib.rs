//! TEE-DM: confidential dataset transfer between two parties.
//!
//! Datasets move between the enclaves of exactly two parties, encrypted
//! under per-transfer data keys held by an external key authority. One
//! party drives the transfer while the other serves a small HTTP endpoint;
//! dataset metadata lives in per-party catalogs, and access is governed by
//! policies registered with the authority.

pub mod client;
pub mod config;
pub mod crypto;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod peer;
pub mod retry;
pub mod role;
pub mod server;
pub mod transfer;
pub mod uri;

pub use config::{Party, TaskConfig};
pub use crypto::DataKey;
pub use driver::{Driver, Operation};
pub use error::{Error, Result};
pub use identity::PartyIdentity;
pub use retry::RetryPolicy;
pub use role::Role;
