use thiserror::Error;

/// Result type for listing operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for a whole collection run
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors raised while enumerating one resource type.
///
/// These are local to the affected pipeline: they are recorded against its
/// service kind and never abort the other pipelines of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection or protocol failure talking to the listing API
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The listing API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A listing page could not be decoded
    #[error("Failed to decode listing page: {0}")]
    Decode(String),

    /// The run was cancelled before the listing was exhausted
    #[error("Listing cancelled")]
    Cancelled,

    /// The pipeline task died before reporting
    #[error("Pipeline aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Errors raised while loading the pricing catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogLoadError {
    /// The snapshot could not be retrieved
    #[error("Pricing catalog unavailable: {0}")]
    Unavailable(String),

    /// The snapshot was retrieved but is malformed
    #[error("Invalid pricing catalog: {0}")]
    Invalid(String),
}

/// Errors that abort an entire collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to load pricing catalog: {0}")]
    CatalogLoad(#[from] CatalogLoadError),

    #[error("Collection cancelled")]
    Cancelled,
}
