use crate::{
    auth::application::{
        request::login_request::LoginRequest, response::login_response::LoginResponse,
    },
    core::{
        domain::{
            error::{ProxmoxError, ProxmoxResult},
            model::{credential::Credential, credential::CredentialSecret, proxmox_auth::ProxmoxAuth},
            value_object::{
                ProxmoxCSRFToken, ProxmoxTicket, ProxmoxUrl, validate_csrf_token, validate_ticket,
            },
        },
        infrastructure::api_client::{classify_send_error, classify_status},
    },
};

use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::debug;

/// Exchanges a username and password for a ticket session.
pub struct LoginService {
    default_headers: HeaderMap,
}

impl LoginService {
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self { default_headers }
    }

    /// Logs in through `POST /access/ticket` with the shared HTTP client.
    ///
    /// A rejected login is an authentication error; a credential without a
    /// password is a configuration error.
    pub async fn execute(
        &self,
        client: &Client,
        base_url: &ProxmoxUrl,
        credential: &Credential,
    ) -> ProxmoxResult<ProxmoxAuth> {
        let request = self.build_login_request(credential)?;
        let url = base_url.api_endpoint("/access/ticket");
        debug!(user = %request.username, realm = %request.realm, "requesting ticket");

        let response = client
            .post(&url)
            .headers(self.default_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error("/access/ticket", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match classify_status("/access/ticket", status, &body) {
                ProxmoxError::NotFound(_) => {
                    ProxmoxError::Connection("login endpoint not found".to_string())
                }
                other => other,
            });
        }

        self.handle_successful_login(response).await
    }

    fn build_login_request(&self, credential: &Credential) -> ProxmoxResult<LoginRequest> {
        match credential.secret() {
            CredentialSecret::Password(password) => Ok(LoginRequest {
                username: credential.username().user().to_string(),
                password: password.as_str().to_string(),
                realm: credential.username().realm().as_str().to_string(),
            }),
            CredentialSecret::Token(_) => Err(ProxmoxError::Configuration(
                "ticket login requires a password credential".to_string(),
            )),
        }
    }

    async fn handle_successful_login(
        &self,
        response: reqwest::Response,
    ) -> ProxmoxResult<ProxmoxAuth> {
        let login_response = response.json::<LoginResponse>().await.map_err(|e| {
            ProxmoxError::Unexpected(format!("Failed to parse login response: {}", e))
        })?;

        validate_ticket(&login_response.data.ticket)?;
        let ticket = ProxmoxTicket::new_unchecked(login_response.data.ticket);
        let csrf_token = match login_response.data.csrf_token {
            Some(token) => {
                validate_csrf_token(&token)?;
                Some(ProxmoxCSRFToken::new_unchecked(token))
            }
            None => None,
        };

        Ok(ProxmoxAuth::new(ticket, csrf_token))
    }
}

impl Default for LoginService {
    fn default() -> Self {
        Self::new()
    }
}
