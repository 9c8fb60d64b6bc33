/// Errors raised while talking to an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    /// The body was not the JSON shape we expected.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL {url}: {message}")]
    InvalidUrl {
        url: String,
        message: String,
    },
}
