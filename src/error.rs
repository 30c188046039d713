use thiserror::Error;

/// Failure talking to the remote API.
///
/// Every variant ends up as the same error state in a list loader; the
/// distinction matters for logs and for single-record lookups.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connectivity, timeout or a non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// The body was not the expected JSON shape.
    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },

    /// HTTP 404 or an empty detail body.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            FetchError::Decode { url, message: e.to_string() }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}
