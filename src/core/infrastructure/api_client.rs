//! HTTP transport to one PVE server: authentication, timeouts and error classification.

use crate::{
    auth::application::service::login_service::LoginService,
    core::domain::{
        config::{MonitorConfig, RateLimitConfig},
        error::{ProxmoxError, ProxmoxResult},
        model::{
            credential::{AuthMethod, Credential},
            proxmox_auth::ProxmoxAuth,
            pve_version::PveVersion,
            server_config::{ServerConfig, ServerId},
        },
        value_object::ProxmoxUrl,
    },
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// The two verbs the monitor needs from the PVE API.
///
/// Implementations return the unwrapped `data` member of the response
/// (`Value::Null` when it is absent) and never retry internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PveTransport: Send + Sync {
    /// `GET /api2/json{path}`
    async fn get(&self, path: &str) -> ProxmoxResult<Value>;

    /// `POST /api2/json{path}` with a JSON body
    async fn post(&self, path: &str, body: &Value) -> ProxmoxResult<Value>;
}

/// Authenticated HTTP client for one PVE server.
///
/// In token mode every request carries the `Authorization` header. In
/// password mode a ticket is obtained lazily on first use, reused until it
/// is older than the configured ticket lifetime, and dropped whenever the
/// server answers 401 or 403 so the next call logs in again.
#[derive(Debug)]
pub struct ApiClient {
    server: ServerId,
    http_client: Client,
    base_url: ProxmoxUrl,
    credential: Credential,
    auth: Arc<RwLock<Option<ProxmoxAuth>>>,
    login_lock: Mutex<()>,
    ticket_lifetime: Duration,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`. The client starts unauthenticated.
    ///
    /// # Errors
    /// Returns `ProxmoxError::Connection` if the HTTP client cannot be built.
    pub fn new(config: &ServerConfig, monitor: &MonitorConfig) -> ProxmoxResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl())
            .timeout(monitor.request_timeout)
            .connect_timeout(monitor.request_timeout)
            .build()
            .map_err(|e| ProxmoxError::Connection(e.to_string()))?;

        Ok(Self {
            server: config.id().clone(),
            http_client,
            base_url: config.base_url().clone(),
            credential: config.credential().clone(),
            auth: Arc::new(RwLock::new(None)),
            login_lock: Mutex::new(()),
            ticket_lifetime: monitor.ticket_lifetime,
            rate_limiter: monitor.rate_limit.map(rate_limiter),
        })
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.credential.auth_method()
    }

    /// Returns the current ticket session, if any.
    pub async fn auth(&self) -> Option<ProxmoxAuth> {
        self.auth.read().await.clone()
    }

    /// Returns `true` if there is a valid (non-expired) ticket.
    pub async fn is_authenticated(&self) -> bool {
        let lock = self.auth.read().await;
        lock.as_ref()
            .map(|a| !a.is_expired(self.ticket_lifetime))
            .unwrap_or(false)
    }

    /// Verifies the credential against the server.
    ///
    /// Password mode performs a fresh login; token mode issues `GET /version`
    /// since tokens have no login step.
    pub async fn authenticate(&self) -> ProxmoxResult<()> {
        match self.credential.auth_method() {
            AuthMethod::Password => {
                let _guard = self.login_lock.lock().await;
                self.login().await
            }
            AuthMethod::Token => self.version().await.map(|_| ()),
        }
    }

    /// The PVE release record from `GET /version`.
    pub async fn version(&self) -> ProxmoxResult<PveVersion> {
        let data = self.execute(Method::GET, "/version", None).await?;
        serde_json::from_value(data)
            .map_err(|e| ProxmoxError::Unexpected(format!("Failed to parse version: {}", e)))
    }

    /// Drops the cached ticket. Later calls log in again.
    pub async fn close(&self) {
        self.auth.write().await.take();
        debug!(server = %self.server, "transport closed");
    }

    async fn execute(&self, method: Method, path: &str, body: Option<&Value>) -> ProxmoxResult<Value> {
        let auth = self.ensure_authenticated().await?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.base_url.api_endpoint(path);
        debug!(server = %self.server, %method, path, "api request");
        let mut request = self.http_client.request(method.clone(), &url);

        if let Some(header) = self.credential.authorization_header() {
            request = request.header("Authorization", header);
        } else if let Some(auth) = &auth {
            request = request.header("Cookie", auth.ticket().as_cookie_header());
            if method != Method::GET {
                if let Some(csrf) = auth.csrf_token() {
                    request = request.header("CSRFPreventionToken", csrf.as_str());
                }
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = classify_status(path, status, &text);
            if matches!(error, ProxmoxError::Authentication(_)) {
                warn!(server = %self.server, path, %status, "request rejected, dropping ticket");
                self.auth.write().await.take();
            }
            return Err(error);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(path, e))?;
        unwrap_data(path, &bytes)
    }

    /// Returns the ticket session to use, logging in first when needed.
    /// Token mode needs none.
    async fn ensure_authenticated(&self) -> ProxmoxResult<Option<ProxmoxAuth>> {
        if self.credential.auth_method() == AuthMethod::Token {
            return Ok(None);
        }
        if let Some(auth) = self.valid_auth().await {
            return Ok(Some(auth));
        }

        let _guard = self.login_lock.lock().await;
        // another caller may have logged in while we waited
        if let Some(auth) = self.valid_auth().await {
            return Ok(Some(auth));
        }
        self.login().await?;
        Ok(self.auth.read().await.clone())
    }

    async fn valid_auth(&self) -> Option<ProxmoxAuth> {
        self.auth
            .read()
            .await
            .as_ref()
            .filter(|a| !a.is_expired(self.ticket_lifetime))
            .cloned()
    }

    async fn login(&self) -> ProxmoxResult<()> {
        let result = LoginService::new()
            .execute(&self.http_client, &self.base_url, &self.credential)
            .await;
        match result {
            Ok(auth) => {
                debug!(server = %self.server, "ticket acquired");
                *self.auth.write().await = Some(auth);
                Ok(())
            }
            Err(e) => {
                warn!(server = %self.server, error = %e, "login failed");
                self.auth.write().await.take();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl PveTransport for ApiClient {
    async fn get(&self, path: &str) -> ProxmoxResult<Value> {
        self.execute(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> ProxmoxResult<Value> {
        self.execute(Method::POST, path, Some(body)).await
    }
}

fn rate_limiter(config: RateLimitConfig) -> Arc<DefaultDirectRateLimiter> {
    let quota = Quota::per_second(config.requests_per_second).allow_burst(config.burst_size);
    Arc::new(DefaultDirectRateLimiter::direct(quota))
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub(crate) fn classify_status(path: &str, status: StatusCode, body: &str) -> ProxmoxError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProxmoxError::Authentication(format!("{} on {}", status, path))
        }
        StatusCode::NOT_FOUND => ProxmoxError::NotFound(path.to_string()),
        _ => ProxmoxError::Unexpected(format!("API error ({}) on {}: {}", status, path, body.trim())),
    }
}

/// Maps a reqwest failure before or while reading a response.
pub(crate) fn classify_send_error(path: &str, error: reqwest::Error) -> ProxmoxError {
    if error.is_timeout() {
        ProxmoxError::Connection(format!("request to {} timed out", path))
    } else if error.is_connect() || error.is_request() || error.is_body() {
        ProxmoxError::Connection(format!("HTTP request to {} failed: {}", path, error))
    } else {
        ProxmoxError::Unexpected(format!("HTTP request to {} failed: {}", path, error))
    }
}

fn unwrap_data(path: &str, bytes: &[u8]) -> ProxmoxResult<Value> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        ProxmoxError::Unexpected(format!("Failed to parse response from {}: {}", path, e))
    })?;
    match value {
        Value::Object(mut map) => Ok(map.remove("data").unwrap_or(Value::Null)),
        _ => Err(ProxmoxError::Unexpected(format!(
            "response from {} is not a JSON object",
            path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::num::NonZeroU32;
    use std::time::Instant;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, header_exists, method, path},
    };

    fn token_config(server_url: &str) -> ServerConfig {
        ServerConfig::builder()
            .host("127.0.0.1")
            .token_auth("root@pam", "hass", "aaaa-bbbb")
            .build()
            .unwrap()
            .with_base_url(server_url)
            .unwrap()
    }

    fn password_config(server_url: &str) -> ServerConfig {
        ServerConfig::builder()
            .host("127.0.0.1")
            .password_auth("root", "secret")
            .build()
            .unwrap()
            .with_base_url(server_url)
            .unwrap()
    }

    async fn mount_login(mock_server: &MockServer, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "ticket": "PVE:root@pam:4EEC61E2::sig",
                    "CSRFPreventionToken": "4EEC61E2:abc123"
                }
            })))
            .expect(expected)
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_token_header_and_data_unwrapping() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .and(header("Authorization", "PVEAPIToken=root@pam!hass=aaaa-bbbb"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "node": "pve1" }] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&token_config(&mock_server.uri()), &MonitorConfig::default()).unwrap();
        let nodes = client.get("/nodes").await.unwrap();
        assert_eq!(nodes, json!([{ "node": "pve1" }]));
    }

    #[tokio::test]
    async fn test_missing_data_is_null() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&token_config(&mock_server.uri()), &MonitorConfig::default()).unwrap();
        assert_eq!(client.get("/nodes").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_password_mode_logs_in_lazily_once() {
        let mock_server = MockServer::start().await;
        mount_login(&mock_server, 1).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .and(header("Cookie", "PVEAuthCookie=PVE:root@pam:4EEC61E2::sig"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&password_config(&mock_server.uri()), &MonitorConfig::default())
                .unwrap();
        assert!(!client.is_authenticated().await);
        client.get("/nodes").await.unwrap();
        client.get("/nodes").await.unwrap();
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_ticket_renewed_once_lifetime_elapses() {
        let mock_server = MockServer::start().await;
        mount_login(&mock_server, 2).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(2)
            .mount(&mock_server)
            .await;

        let monitor = MonitorConfig {
            ticket_lifetime: Duration::from_millis(1),
            ..Default::default()
        };
        let client = ApiClient::new(&password_config(&mock_server.uri()), &monitor).unwrap();
        client.get("/nodes").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.get("/nodes").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_carries_csrf_token() {
        let mock_server = MockServer::start().await;
        mount_login(&mock_server, 1).await;
        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve1/qemu/100/status/start"))
            .and(header("CSRFPreventionToken", "4EEC61E2:abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": "UPID:pve1:0000:qmstart:100:root@pam:" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&password_config(&mock_server.uri()), &MonitorConfig::default())
                .unwrap();
        let task = client
            .post("/nodes/pve1/qemu/100/status/start", &json!({}))
            .await
            .unwrap();
        assert_eq!(task, json!("UPID:pve1:0000:qmstart:100:root@pam:"));
    }

    #[tokio::test]
    async fn test_unauthorized_drops_ticket_without_retry() {
        let mock_server = MockServer::start().await;
        mount_login(&mock_server, 1).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .and(header_exists("Cookie"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&password_config(&mock_server.uri()), &MonitorConfig::default())
                .unwrap();
        let result = client.get("/nodes").await;
        assert!(matches!(result, Err(ProxmoxError::Authentication(_))));
        assert!(client.auth().await.is_none());
    }

    #[tokio::test]
    async fn test_login_rejection_is_authentication_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&password_config(&mock_server.uri()), &MonitorConfig::default())
                .unwrap();
        assert!(matches!(
            client.authenticate().await,
            Err(ProxmoxError::Authentication(_))
        ));
        assert!(matches!(
            client.get("/nodes").await,
            Err(ProxmoxError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api2/json/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api2/json/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api2/json/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&token_config(&mock_server.uri()), &MonitorConfig::default()).unwrap();
        assert!(matches!(
            client.get("/forbidden").await,
            Err(ProxmoxError::Authentication(_))
        ));
        assert!(matches!(client.get("/gone").await, Err(ProxmoxError::NotFound(_))));
        assert!(matches!(
            client.get("/broken").await,
            Err(ProxmoxError::Unexpected(_))
        ));
        assert!(matches!(
            client.get("/garbled").await,
            Err(ProxmoxError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_connection_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let monitor = MonitorConfig {
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let client = ApiClient::new(&token_config(&mock_server.uri()), &monitor).unwrap();
        assert!(matches!(
            client.get("/nodes").await,
            Err(ProxmoxError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let config = token_config("http://127.0.0.1:9/");
        let client = ApiClient::new(&config, &MonitorConfig::default()).unwrap();
        assert!(matches!(
            client.get("/nodes").await,
            Err(ProxmoxError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_token_authenticate_uses_version() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "version": "8.2.4", "release": "8.2", "repoid": "faa83925" }
            })))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client =
            ApiClient::new(&token_config(&mock_server.uri()), &MonitorConfig::default()).unwrap();
        client.authenticate().await.unwrap();
        let version = client.version().await.unwrap();
        assert_eq!(version.version, "8.2.4");
        assert_eq!(version.to_string(), "pve-manager/8.2.4/faa83925");
    }

    #[tokio::test]
    async fn test_rate_limiting_delays_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api2/json/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "ok" })))
            .expect(4)
            .mount(&mock_server)
            .await;

        let monitor = MonitorConfig {
            rate_limit: Some(RateLimitConfig {
                requests_per_second: NonZeroU32::new(2).unwrap(),
                burst_size: NonZeroU32::new(2).unwrap(),
            }),
            ..Default::default()
        };
        let client = ApiClient::new(&token_config(&mock_server.uri()), &monitor).unwrap();

        let start = Instant::now();
        let (a, b) = tokio::join!(client.get("/test"), client.get("/test"));
        a.unwrap();
        b.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));

        let start = Instant::now();
        let (c, d) = tokio::join!(client.get("/test"), client.get("/test"));
        c.unwrap();
        d.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_close_drops_ticket() {
        let mock_server = MockServer::start().await;
        mount_login(&mock_server, 1).await;

        let client =
            ApiClient::new(&password_config(&mock_server.uri()), &MonitorConfig::default())
                .unwrap();
        client.authenticate().await.unwrap();
        assert!(client.is_authenticated().await);
        client.close().await;
        assert!(!client.is_authenticated().await);
    }
}
