//! Per-server configuration: the recognized options and their validated form.

use crate::{
    auth::application::service::credential_resolver::CredentialResolver,
    core::domain::{
        error::{ProxmoxError, ProxmoxResult, ValidationError},
        model::credential::{AuthMethod, Credential},
        value_object::{
            DEFAULT_PORT, ProxmoxHost, ProxmoxPort, ProxmoxUrl, validate_host, validate_port,
        },
    },
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 30;
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 10;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 300;

/// Identity of a configured server inside a registry (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The recognized configuration options for one server, as stored by the host.
///
/// Deserializes from the option map (`host`, `port`, `username`, `auth_method`,
/// `password`, `token_name`, `token_value`, `verify_ssl`, `update_interval`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerOptions {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_value: Option<String>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Poll interval in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_verify_ssl() -> bool {
    true
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

impl ServerOptions {
    /// Validates the options into an immutable [`ServerConfig`].
    ///
    /// When `auth_method` is given it must agree with the material present:
    /// `password` forbids token fields and `token` forbids a password.
    pub fn into_config(self) -> ProxmoxResult<ServerConfig> {
        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        let has_token = self.token_name.as_deref().is_some_and(|t| !t.is_empty())
            || self.token_value.as_deref().is_some_and(|t| !t.is_empty());

        match self.auth_method {
            Some(AuthMethod::Password) if has_token => {
                return Err(ProxmoxError::Configuration(
                    "auth_method is 'password' but token fields are set".to_string(),
                ));
            }
            Some(AuthMethod::Token) if has_password => {
                return Err(ProxmoxError::Configuration(
                    "auth_method is 'token' but a password is set".to_string(),
                ));
            }
            _ => {}
        }

        let mut builder = ServerConfig::builder()
            .host(self.host)
            .port(self.port)
            .username(self.username)
            .verify_ssl(self.verify_ssl)
            .update_interval(Duration::from_secs(self.update_interval));
        if let Some(password) = self.password {
            builder = builder.password(password);
        }
        if self.token_name.is_some() || self.token_value.is_some() {
            builder = builder.token(
                self.token_name.unwrap_or_default(),
                self.token_value.unwrap_or_default(),
            );
        }
        builder.build()
    }
}

/// Validated configuration of one PVE server. Immutable after creation.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    id: ServerId,
    host: ProxmoxHost,
    port: ProxmoxPort,
    raw_username: String,
    credential: Credential,
    verify_ssl: bool,
    update_interval: Duration,
    base_url: ProxmoxUrl,
}

impl ServerConfig {
    /// Creates a new builder for ServerConfig
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn id(&self) -> &ServerId {
        &self.id
    }

    pub fn host(&self) -> &ProxmoxHost {
        &self.host
    }

    pub fn port(&self) -> ProxmoxPort {
        self.port
    }

    /// The username exactly as configured, before realm normalization.
    pub fn raw_username(&self) -> &str {
        &self.raw_username
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn base_url(&self) -> &ProxmoxUrl {
        &self.base_url
    }

    /// Points the config at an explicit base URL (plain-HTTP test servers).
    pub(crate) fn with_base_url(mut self, raw: &str) -> ProxmoxResult<Self> {
        self.base_url = ProxmoxUrl::parse(raw)?;
        Ok(self)
    }
}

/// Builder for ServerConfig
///
/// # Examples
///
/// ```
/// use leeca_proxmox_monitor::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .host("pve.example.com")
///     .username("root")
///     .token("hass", "00000000-0000-0000-0000-000000000000")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.id().as_str(), "pve.example.com:8006");
/// assert!(config.verify_ssl());
/// ```
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    token: Option<(String, String)>,
    verify_ssl: Option<bool>,
    update_interval: Option<Duration>,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn token(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.token = Some((name.into(), value.into()));
        self
    }

    /// Shorthand for `username` + `password`.
    pub fn password_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username(username).password(password)
    }

    /// Shorthand for `username` + `token`.
    pub fn token_auth(
        self,
        username: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.username(username).token(name, value)
    }

    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = Some(verify_ssl);
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = Some(interval);
        self
    }

    pub fn build(self) -> ProxmoxResult<ServerConfig> {
        let host = self.host.ok_or_else(|| ValidationError::Field {
            field: "host".to_string(),
            message: "Host is required".to_string(),
        })?;
        let host = host.trim().to_string();
        validate_host(&host)?;
        let host = ProxmoxHost::new_unchecked(host);

        let port = self.port.unwrap_or(DEFAULT_PORT);
        validate_port(port)?;
        let port = ProxmoxPort::new_unchecked(port);

        let update_interval = self
            .update_interval
            .unwrap_or(Duration::from_secs(DEFAULT_UPDATE_INTERVAL_SECS));
        validate_update_interval(update_interval)?;

        let raw_username = self.username.ok_or_else(|| ValidationError::Field {
            field: "username".to_string(),
            message: "Username is required".to_string(),
        })?;
        let credential = CredentialResolver::resolve(
            &raw_username,
            self.password.as_deref(),
            self.token
                .as_ref()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )?;

        let base_url = ProxmoxUrl::from_parts(&host, &port)?;
        let id = ServerId::new(format!("{}:{}", host.as_str(), port.get()));

        Ok(ServerConfig {
            id,
            host,
            port,
            raw_username,
            credential,
            verify_ssl: self.verify_ssl.unwrap_or(true),
            update_interval,
            base_url,
        })
    }
}

fn validate_update_interval(interval: Duration) -> Result<(), ValidationError> {
    let secs = interval.as_secs();
    if !(MIN_UPDATE_INTERVAL_SECS..=MAX_UPDATE_INTERVAL_SECS).contains(&secs) {
        return Err(ValidationError::ConstraintViolation(format!(
            "update_interval must be between {} and {} seconds (got {})",
            MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS, secs
        )));
    }
    Ok(())
}
