//! Provider HTTP client.
//!
//! Every request carries the provider's auth header and a fixed mobile
//! user agent (at least one provider blocks anything else). Requests have
//! a hard timeout and anything but `200 OK` is an error.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};
use tracing::debug;

use super::error::UpstreamError;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent expected by providers.
pub const DEVICE_USER_AGENT: &str = "okhttp/4.10.0";

/// Header carrying the provider auth key.
pub const AUTH_HEADER: &str = "x-api-authentication";

/// Number of body bytes echoed into debug logs.
const LOG_SAMPLE_BYTES: usize = 100;

/// Directory listing for a provider.
pub fn network_url(base_url: &str) -> String {
    format!("{base_url}/publicapi/v1/networkextended.php?action=get_cities_extended")
}

/// Plaintext (v1) arrivals for one station.
pub fn announcement_url(base_url: &str, uid: impl std::fmt::Display) -> String {
    format!(
        "{base_url}/publicapi/v1/announcement/announcement.php?action=get_announcement_data&station_uid={uid}"
    )
}

/// Encrypted (v2) bulletin endpoint.
pub fn bulletin_url(base_url: &str) -> String {
    format!("{base_url}/publicapi/v2/api.php")
}

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UpstreamConfig {
    /// Set a custom timeout (for testing).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client shared by all providers.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http })
    }

    /// Perform a request and return the raw response body.
    ///
    /// When `form_body` is given it is sent verbatim as
    /// `application/x-www-form-urlencoded`; callers are responsible for
    /// encoding the field values.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        auth_key: &str,
        form_body: Option<String>,
    ) -> Result<Vec<u8>, UpstreamError> {
        let auth = HeaderValue::from_str(auth_key).map_err(|_| UpstreamError::InvalidAuthKey)?;

        debug!(%method, url, "upstream request");

        let mut request = self
            .http
            .request(method, url)
            .header(AUTH_HEADER, auth)
            .header(USER_AGENT, DEVICE_USER_AGENT);

        if let Some(body) = form_body {
            request = request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.bytes().await?.to_vec();

        debug!(
            status = status.as_u16(),
            len = body.len(),
            sample = %String::from_utf8_lossy(&body[..body.len().min(LOG_SAMPLE_BYTES)]),
            "upstream response"
        );

        Ok(body)
    }

    /// GET `url` with the provider's auth key.
    pub async fn get(&self, url: &str, auth_key: &str) -> Result<Vec<u8>, UpstreamError> {
        self.fetch(Method::GET, url, auth_key, None).await
    }

    /// POST a pre-encoded form body to `url`.
    pub async fn post_form(
        &self,
        url: &str,
        auth_key: &str,
        body: String,
    ) -> Result<Vec<u8>, UpstreamError> {
        self.fetch(Method::POST, url, auth_key, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn header(headers: &HeaderMap, name: &str) -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn endpoint_urls() {
        assert_eq!(
            network_url("https://bg.example"),
            "https://bg.example/publicapi/v1/networkextended.php?action=get_cities_extended"
        );
        assert_eq!(
            announcement_url("https://bg.example", 4567),
            "https://bg.example/publicapi/v1/announcement/announcement.php?action=get_announcement_data&station_uid=4567"
        );
        assert_eq!(
            bulletin_url("https://bg.example"),
            "https://bg.example/publicapi/v2/api.php"
        );
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(UpstreamConfig::default().timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn get_sends_auth_and_user_agent() {
        let router = Router::new().route(
            "/echo",
            get(|headers: HeaderMap| async move {
                format!(
                    "{}|{}",
                    header(&headers, AUTH_HEADER),
                    header(&headers, "user-agent")
                )
            }),
        );
        let base = serve(router).await;

        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let body = client.get(&format!("{base}/echo"), "secret").await.unwrap();

        assert_eq!(String::from_utf8(body).unwrap(), "secret|okhttp/4.10.0");
    }

    #[tokio::test]
    async fn post_form_sends_body_verbatim() {
        let router = Router::new().route(
            "/form",
            post(|headers: HeaderMap, body: String| async move {
                format!("{}|{body}", header(&headers, "content-type"))
            }),
        );
        let base = serve(router).await;

        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let body = client
            .post_form(&format!("{base}/form"), "k", "action=x&base=a%2Bb".into())
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "application/x-www-form-urlencoded|action=x&base=a%2Bb"
        );
    }

    #[tokio::test]
    async fn non_200_is_status_error() {
        let router = Router::new()
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "details") }))
            .route("/created", get(|| async { (StatusCode::CREATED, "ok") }));
        let base = serve(router).await;

        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();

        let err = client.get(&format!("{base}/gone"), "k").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(404)));

        let err = client
            .get(&format!("{base}/created"), "k")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status(201)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let base = serve(router).await;

        let client =
            UpstreamClient::new(UpstreamConfig::default().with_timeout(Duration::from_millis(100)))
                .unwrap();
        let err = client.get(&format!("{base}/slow"), "k").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Timeout));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let err = client
            .get(&format!("http://{addr}/"), "k")
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[tokio::test]
    async fn invalid_auth_key_rejected_before_sending() {
        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let err = client
            .get("http://127.0.0.1:9/", "bad\nkey")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidAuthKey));
    }

    #[tokio::test]
    async fn query_string_reaches_upstream() {
        let router = Router::new().route(
            "/publicapi/v1/announcement/announcement.php",
            get(
                |axum::extract::Query(q): axum::extract::Query<HashMap<String, String>>| async move {
                    format!("{}:{}", q["action"], q["station_uid"])
                },
            ),
        );
        let base = serve(router).await;

        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let body = client
            .get(&announcement_url(&base, 4567), "k")
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "get_announcement_data:4567"
        );
    }
}
