//! Errors surfaced by station resolution.

use crate::crypto::CipherError;
use crate::upstream::UpstreamError;

/// Failures of the encrypted bulletin exchange.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("provider has no cipher key configured")]
    MissingCipher,

    #[error("failed to encode bulletin request: {0}")]
    RequestEncoding(#[source] serde_json::Error),

    #[error("failed to encrypt bulletin request: {0}")]
    Encrypt(#[source] CipherError),

    #[error("failed to decrypt bulletin response: {0}")]
    Decrypt(#[source] CipherError),

    #[error("failed to decode bulletin envelope: {0}")]
    Envelope(#[source] serde_json::Error),
}

/// Errors from resolving a station or an area.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown city: {0}")]
    UnknownCity(String),

    #[error("station directory for {city} is not populated yet")]
    NotReady { city: String },

    #[error("invalid station: {0}")]
    InvalidStation(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] UpstreamError),

    #[error("upstream protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("station {0} not found")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ResolveError::NotReady { city: "bg".into() };
        assert_eq!(
            err.to_string(),
            "station directory for bg is not populated yet"
        );

        let err = ResolveError::from(UpstreamError::Status(503));
        assert_eq!(
            err.to_string(),
            "upstream request failed: request failed with status code 503"
        );

        let err = ResolveError::from(ProtocolError::Decrypt(CipherError::Padding));
        assert!(err.to_string().starts_with("upstream protocol error: "));
        assert!(err.to_string().contains("decrypt"));
    }
}
