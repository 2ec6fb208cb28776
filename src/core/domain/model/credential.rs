//! Resolved authentication material for one server.

use crate::core::domain::value_object::{ProxmoxApiToken, ProxmoxPassword, ProxmoxUsername};
use serde::{Deserialize, Serialize};

/// How a server is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Password,
    Token,
}

/// The secret half of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSecret {
    /// Exchanged for a ticket at `/access/ticket`.
    Password(ProxmoxPassword),
    /// Sent on every request in the `Authorization` header.
    Token(ProxmoxApiToken),
}

/// A realm-qualified user id plus either a password or an API token.
///
/// Always derived from a [`ServerConfig`](super::server_config::ServerConfig),
/// never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    username: ProxmoxUsername,
    secret: CredentialSecret,
}

impl Credential {
    pub(crate) fn new(username: ProxmoxUsername, secret: CredentialSecret) -> Self {
        Self { username, secret }
    }

    /// The qualified user id.
    pub fn username(&self) -> &ProxmoxUsername {
        &self.username
    }

    pub fn secret(&self) -> &CredentialSecret {
        &self.secret
    }

    pub fn auth_method(&self) -> AuthMethod {
        match self.secret {
            CredentialSecret::Password(_) => AuthMethod::Password,
            CredentialSecret::Token(_) => AuthMethod::Token,
        }
    }

    /// The wire-level token id `user@realm!token_name`, in token mode.
    pub fn token_id(&self) -> Option<String> {
        match &self.secret {
            CredentialSecret::Token(token) => {
                Some(format!("{}!{}", self.username.qualified(), token.name()))
            }
            CredentialSecret::Password(_) => None,
        }
    }

    /// The `Authorization` header value in token mode:
    /// `PVEAPIToken=user@realm!token_name=token_value`.
    pub fn authorization_header(&self) -> Option<String> {
        match &self.secret {
            CredentialSecret::Token(token) => self
                .token_id()
                .map(|id| format!("PVEAPIToken={}={}", id, token.secret())),
            CredentialSecret::Password(_) => None,
        }
    }
}
