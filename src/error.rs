use thiserror::Error;

/// Errors raised while fetching raw category/document collections.
///
/// The taxonomy engine itself never fails; only the input providers do.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure talking to the REST backend
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Reading a local collection file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider cannot be built from the given config
    #[error("source misconfigured: {0}")]
    Misconfigured(String),

    /// Payload is JSON but not a record list
    #[error("expected a JSON array of records from {0}")]
    UnexpectedShape(String),
}
