//! Stats gateway for the WakaTime summaries API
//!
//! Holds the credential server-side, performs a single upstream GET for the
//! last 7 days and classifies failures. The gateway never builds an HTTP
//! response itself; callers map the returned `Result` to their transport.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::CredentialSource;
use crate::types::{GatewayError, Result, WakastatsError, WeekSummary};

/// Default WakaTime host
pub const DEFAULT_BASE_URL: &str = "https://wakatime.com";

/// Summaries endpoint for the authenticated user
pub const SUMMARIES_PATH: &str = "/api/v1/users/current/summaries";

/// Fixed summary range; callers cannot change it
pub const SUMMARY_RANGE: &str = "last_7_days";

/// Every WakaTime secret key starts with this prefix
pub const API_KEY_PREFIX: &str = "waka_";

const USER_AGENT: &str = concat!("wakastats/", env!("CARGO_PKG_VERSION"));

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Status and body text of an upstream reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// Outbound HTTP seam. `Err` carries the transport error text.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        authorization: &str,
    ) -> std::result::Result<UpstreamResponse, String>;
}

/// reqwest-backed upstream client. No timeout override, no retries.
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WakastatsError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get(
        &self,
        url: &str,
        authorization: &str,
    ) -> std::result::Result<UpstreamResponse, String> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {}", e))?;

        Ok(UpstreamResponse { status, body })
    }
}

/// A successful upstream body, kept byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekPayload {
    body: String,
    day_count: usize,
}

impl WeekPayload {
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Number of entries in `data`, 0 when it is missing or not an array
    pub fn day_count(&self) -> usize {
        self.day_count
    }

    pub fn parse(&self) -> Result<WeekSummary> {
        WeekSummary::from_json(self.body.as_str())
    }
}

/// `Basic base64("{key}:")`, the key as username with an empty password
pub fn basic_authorization(api_key: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:", api_key));
    format!("Basic {}", encoded)
}

/// Map a non-2xx upstream status to its error kind
pub fn classify_status(status: u16, body: String) -> GatewayError {
    match status {
        401 => GatewayError::Authentication { details: body },
        403 => GatewayError::Authorization { details: body },
        429 => GatewayError::RateLimited { details: body },
        _ => GatewayError::Upstream {
            status,
            details: body,
        },
    }
}

pub struct StatsGateway {
    client: Arc<dyn UpstreamClient>,
    summaries_url: String,
}

impl StatsGateway {
    pub fn new(client: Arc<dyn UpstreamClient>, base_url: &str) -> Self {
        let summaries_url = format!(
            "{}{}?range={}",
            base_url.trim_end_matches('/'),
            SUMMARIES_PATH,
            SUMMARY_RANGE
        );
        Self {
            client,
            summaries_url,
        }
    }

    pub fn summaries_url(&self) -> &str {
        &self.summaries_url
    }

    /// Fetch the last 7 days of summaries.
    ///
    /// Checks run in order: method, credential presence, credential format.
    /// The credential is only read once the method is accepted, and any
    /// failed check means no outbound call is made.
    pub async fn fetch(
        &self,
        method: &Method,
        credentials: &dyn CredentialSource,
    ) -> GatewayResult<WeekPayload> {
        if *method != Method::GET {
            return Err(GatewayError::MethodNotAllowed);
        }

        let api_key = credentials.api_key();
        let api_key = match api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                error!("WAKATIME_API_KEY not found in environment");
                return Err(GatewayError::MissingCredential);
            }
        };

        if !api_key.starts_with(API_KEY_PREFIX) {
            error!("WAKATIME_API_KEY has an invalid format");
            return Err(GatewayError::MalformedCredential);
        }

        info!(url = %self.summaries_url, "fetching WakaTime summaries");

        let authorization = basic_authorization(api_key);
        let response = self
            .client
            .get(&self.summaries_url, &authorization)
            .await
            .map_err(|details| {
                error!(err = %details, "WakaTime request failed");
                GatewayError::Transport { details }
            })?;

        info!(status = response.status, "WakaTime responded");

        if !(200..300).contains(&response.status) {
            error!(status = response.status, body = %response.body, "WakaTime API error");
            return Err(classify_status(response.status, response.body));
        }

        // Any JSON is forwarded; the shape is only checked by callers that parse it
        let json: Value = serde_json::from_str(&response.body).map_err(|e| {
            error!(err = %e, "WakaTime returned a non-JSON body");
            GatewayError::Transport {
                details: e.to_string(),
            }
        })?;
        let day_count = json.get("data").and_then(Value::as_array).map_or(0, Vec::len);

        info!(days = day_count, "fetched WakaTime summaries");

        Ok(WeekPayload {
            body: response.body,
            day_count,
        })
    }

    /// GET and parse in one step, for callers that aggregate server-side
    pub async fn fetch_week(
        &self,
        credentials: &dyn CredentialSource,
    ) -> GatewayResult<WeekSummary> {
        let payload = self.fetch(&Method::GET, credentials).await?;
        payload.parse().map_err(|e| {
            error!(err = %e, "WakaTime payload does not match the summaries shape");
            GatewayError::Transport {
                details: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::StaticCredential;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) const TEST_KEY: &str = "waka_0123-test";

    pub(crate) const WEEK_BODY: &str = r#"{"data":[{"languages":[{"name":"TypeScript","total_seconds":3600,"percent":60},{"name":"Python","total_seconds":2400,"percent":40}],"grand_total":{"text":"1 hr 40 mins","total_seconds":6000},"range":{"date":"2024-05-06"}}],"start":"2024-05-06T00:00:00Z"}"#;

    /// Canned upstream that counts calls and records the request
    pub(crate) struct MockUpstream {
        reply: std::result::Result<UpstreamResponse, String>,
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<(String, String)>>,
    }

    impl MockUpstream {
        pub(crate) fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(UpstreamResponse {
                    status,
                    body: body.to_string(),
                }),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        pub(crate) fn failing(details: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(details.to_string()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamClient for MockUpstream {
        async fn get(
            &self,
            url: &str,
            authorization: &str,
        ) -> std::result::Result<UpstreamResponse, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((url.to_string(), authorization.to_string()));
            self.reply.clone()
        }
    }

    struct CountingCredential(AtomicUsize);

    impl CredentialSource for CountingCredential {
        fn api_key(&self) -> Option<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    fn key(value: &str) -> StaticCredential {
        StaticCredential(Some(value.to_string()))
    }

    fn gateway(mock: &Arc<MockUpstream>) -> StatsGateway {
        StatsGateway::new(mock.clone(), "https://wakatime.test/")
    }

    // ========== helpers ==========

    #[test]
    fn test_basic_authorization_empty_password() {
        // base64("waka_abc:")
        assert_eq!(basic_authorization("waka_abc"), "Basic d2FrYV9hYmM6");
    }

    #[test]
    fn test_summaries_url_fixed_range() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        assert_eq!(
            gateway(&mock).summaries_url(),
            "https://wakatime.test/api/v1/users/current/summaries?range=last_7_days"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(401, String::new()),
            GatewayError::Authentication { .. }
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            GatewayError::Authorization { .. }
        ));
        assert!(matches!(
            classify_status(429, String::new()),
            GatewayError::RateLimited { .. }
        ));
        assert_eq!(
            classify_status(500, "boom".into()),
            GatewayError::Upstream {
                status: 500,
                details: "boom".into()
            }
        );
    }

    // ========== preconditions ==========

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let err = gateway(&mock)
            .fetch(&Method::GET, &StaticCredential(None))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::MissingCredential);
        assert_eq!(err.status(), 500);
        assert_eq!(err.to_string(), "WakaTime API key not configured");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_credential_is_missing() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let err = gateway(&mock)
            .fetch(&Method::GET, &key("   "))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::MissingCredential);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_credential_makes_no_call() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let err = gateway(&mock)
            .fetch(&Method::GET, &key("sk_not_waka"))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::MalformedCredential);
        assert_eq!(err.status(), 500);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_method_checked_before_credential() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let credentials = CountingCredential(AtomicUsize::new(0));
        let err = gateway(&mock)
            .fetch(&Method::POST, &credentials)
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::MethodNotAllowed);
        assert_eq!(err.status(), 405);
        assert_eq!(credentials.0.load(Ordering::SeqCst), 0);
        assert_eq!(mock.call_count(), 0);
    }

    // ========== upstream outcomes ==========

    #[tokio::test]
    async fn test_success_returns_body_verbatim() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let payload = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap();

        assert_eq!(payload.body(), WEEK_BODY);
        assert_eq!(payload.day_count(), 1);
        assert_eq!(mock.call_count(), 1);

        let (url, authorization) = mock.last_request.lock().unwrap().clone().unwrap();
        assert!(url.ends_with("?range=last_7_days"));
        assert_eq!(authorization, basic_authorization(TEST_KEY));
    }

    #[tokio::test]
    async fn test_upstream_401_is_authentication_error() {
        let mock = MockUpstream::replying(401, r#"{"error":"Unauthorized"}"#);
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 401);
        assert_eq!(err.kind(), crate::types::ErrorKind::Authentication);
        assert_eq!(err.details(), Some(r#"{"error":"Unauthorized"}"#));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_upstream_403_and_429() {
        let mock = MockUpstream::replying(403, "forbidden");
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(err.to_string(), "Access forbidden");

        let mock = MockUpstream::replying(429, "slow down");
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 429);
        assert_eq!(err.to_string(), "Rate limit exceeded");
        // No automatic retry
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_other_status_forwarded_with_body() {
        let mock = MockUpstream::replying(503, "maintenance");
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::Upstream {
                status: 503,
                details: "maintenance".into()
            }
        );
        assert_eq!(err.to_string(), "WakaTime API error: 503");
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mock = MockUpstream::failing("connection reset by peer");
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 500);
        assert_eq!(err.to_string(), "Failed to fetch WakaTime data");
        assert_eq!(err.details(), Some("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_non_json_success_body() {
        let mock = MockUpstream::replying(200, "<html>captive portal</html>");
        let err = gateway(&mock)
            .fetch(&Method::GET, &key(TEST_KEY))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport { .. }));
        assert_eq!(err.status(), 500);
        assert_eq!(err.to_string(), "Failed to fetch WakaTime data");
        assert!(err.details().is_some_and(|d| !d.is_empty()));
        assert_eq!(err.hint(), Some("Check server logs for more details"));
    }

    #[tokio::test]
    async fn test_any_json_success_body_is_forwarded() {
        for body in [r#""just a string""#, r#"{"data":{}}"#, "[]", "null"] {
            let mock = MockUpstream::replying(200, body);
            let payload = gateway(&mock)
                .fetch(&Method::GET, &key(TEST_KEY))
                .await
                .unwrap();

            assert_eq!(payload.body(), body);
            assert_eq!(payload.day_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_fetch_week_parses_payload() {
        let mock = MockUpstream::replying(200, WEEK_BODY);
        let week = gateway(&mock).fetch_week(&key(TEST_KEY)).await.unwrap();

        assert_eq!(week.len(), 1);
        assert_eq!(week.data[0].grand_total_seconds(), 6000);
    }

    #[tokio::test]
    async fn test_fetch_week_rejects_wrong_shape() {
        let mock = MockUpstream::replying(200, r#"{"data":[{"range":{"date":"not-a-date"}}]}"#);
        let err = gateway(&mock).fetch_week(&key(TEST_KEY)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert_eq!(err.status(), 500);
    }
}
