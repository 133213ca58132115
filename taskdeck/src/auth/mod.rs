//! Client-side session persistence.
//!
//! Credentials are verified by an external auth service. This module only
//! keeps what that service hands back: a bearer token and the user id it
//! belongs to, stored through an injected [`TokenStorage`] and treated as
//! absent once [`SESSION_LIFETIME_DAYS`] have passed.

pub mod session;
pub mod storage;

use std::path::PathBuf;

pub use session::{SESSION_LIFETIME_DAYS, Session, SessionManager};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

/// Errors from session persistence.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token file exists but could not be read.
    #[error("failed to read token store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token file could not be written.
    #[error("failed to write token store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token file is not a JSON object of strings.
    #[error("token store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A session could not be encoded.
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    /// A sign-in was attempted with an empty token or user id.
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}
