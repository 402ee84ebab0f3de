//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

/// Query for a single station. `uid` wins when both are given.
#[derive(Debug, Default, Deserialize)]
pub struct StationSearchRequest {
    /// Provider UID
    pub uid: Option<String>,

    /// Public station ID
    pub id: Option<String>,
}

/// Query for stations around a point.
///
/// Fields are kept as strings so malformed numbers get a specific message.
#[derive(Debug, Default, Deserialize)]
pub struct AreaRequest {
    pub lat: Option<String>,
    pub lon: Option<String>,

    /// Radius in metres
    pub rad: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,

    /// Server time, RFC 3339
    pub time: String,

    /// Whether the last directory population pass has finished
    pub directory_ready: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_uses_camel_case() {
        let health = HealthResponse {
            status: "ok".into(),
            time: "2024-01-01T00:00:00+00:00".into(),
            directory_ready: true,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["directoryReady"], true);
        assert!(json.get("directory_ready").is_none());
    }

    #[test]
    fn search_request_fields_are_optional() {
        let req: StationSearchRequest = serde_json::from_str(r#"{"id": "123"}"#).unwrap();
        assert_eq!(req.id.as_deref(), Some("123"));
        assert!(req.uid.is_none());
    }
}
