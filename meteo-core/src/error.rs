use thiserror::Error;

/// Failure of a single HTTP request against one of the dashboard's services.
///
/// Callers are expected to treat every variant as "the operation failed";
/// the distinction exists for logging and messages only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to parse JSON returned by {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request was cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
