//! Cloud inventory providers
//!
//! Concrete listers and the pricing snapshot loader behind the
//! `domain_inventory` seams.

pub mod gcp;
pub mod snapshot;

use domain_inventory::{CatalogLoadError, FetchError};
use thiserror::Error;

pub use gcp::{AddressLister, DiskLister, GcpComputeClient};
pub use snapshot::SnapshotCatalogSource;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for FetchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::HttpError(e) if e.is_decode() => FetchError::Decode(e.to_string()),
            ProviderError::HttpError(e) => FetchError::Transport(e.to_string()),
            ProviderError::IoError(e) => FetchError::Transport(e.to_string()),
            ProviderError::ParseError(message) => FetchError::Decode(message),
            ProviderError::AuthError(message) => FetchError::Auth(message),
            ProviderError::ApiError { status, message } => FetchError::Api { status, message },
        }
    }
}

impl From<ProviderError> for CatalogLoadError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ParseError(message) => CatalogLoadError::Invalid(message),
            other => CatalogLoadError::Unavailable(other.to_string()),
        }
    }
}
