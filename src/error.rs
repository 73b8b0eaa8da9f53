use thiserror::Error;

/// Failures while walking the remote map catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the collaborators a selection talks to.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Notification error: {0}")]
    Notification(String),
}
