//! Unified error taxonomy for the transfer protocol.
//!
//! Every fallible operation in this crate returns [`Result`]. The variants
//! classify failures by how callers should react: only [`Error::Transport`]
//! is retryable, everything else aborts the running task.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent task configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid caller-supplied value, such as a URI with the wrong scheme.
    #[error("input error: {0}")]
    Input(String),

    /// Network-level failure or a non-success response from a remote party.
    #[error("transport error: {0}")]
    Transport(String),

    /// The key authority rejected a request.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// A spawned passive endpoint exited unsuccessfully.
    #[error("endpoint process exited with code {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },

    /// Encryption or decryption failure, including tampered ciphertext.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the retrying transport may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
