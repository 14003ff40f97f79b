use thiserror::Error;

use crate::models::DecodeError;

/// Error type for every session, transport and decode failure in the client.
/// None of these are fatal: each one is scoped to a single fetch or mutation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("View is already mounted or has been torn down")]
    AlreadyMounted,
}
