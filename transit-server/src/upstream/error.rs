//! Upstream client error types.

/// Errors from an outbound provider request.
///
/// Bodies of non-200 responses are discarded; only the status is kept.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request did not complete within the configured timeout
    #[error("upstream request timed out")]
    Timeout,

    /// Connection or protocol failure before a response was received
    #[error("upstream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Upstream answered with something other than 200 OK
    #[error("request failed with status code {0}")]
    Status(u16),

    /// Auth key cannot be sent as a header value
    #[error("invalid auth key format")]
    InvalidAuthKey,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(err)
        }
    }
}
