//! Turns raw configured credentials into the exact material PVE expects.

use crate::core::domain::{
    error::{ProxmoxError, ProxmoxResult},
    model::credential::{Credential, CredentialSecret},
    value_object::{ProxmoxApiToken, ProxmoxPassword, ProxmoxUsername, validate_password},
};

/// Resolves a raw username plus exactly one of a password or a token pair.
///
/// Empty strings count as absent. Supplying both kinds of material, neither,
/// or only half of a token pair is a configuration error; the check happens
/// before any network call.
///
/// # Examples
///
/// ```
/// use leeca_proxmox_monitor::CredentialResolver;
///
/// let credential = CredentialResolver::resolve("root", None, Some(("hass", "secret"))).unwrap();
/// assert_eq!(credential.token_id().as_deref(), Some("root@pam!hass"));
/// ```
pub struct CredentialResolver;

impl CredentialResolver {
    pub fn resolve(
        username: &str,
        password: Option<&str>,
        token: Option<(&str, &str)>,
    ) -> ProxmoxResult<Credential> {
        let password = password.filter(|p| !p.is_empty());
        let token = match token {
            Some((name, value)) => match (name.trim().is_empty(), value.is_empty()) {
                (true, true) => None,
                (false, false) => Some((name, value)),
                _ => {
                    return Err(ProxmoxError::Configuration(
                        "token_name and token_value must be provided together".to_string(),
                    ));
                }
            },
            None => None,
        };

        let secret = match (password, token) {
            (Some(_), Some(_)) => {
                return Err(ProxmoxError::Configuration(
                    "both a password and an API token were provided; configure exactly one"
                        .to_string(),
                ));
            }
            (None, None) => {
                return Err(ProxmoxError::Configuration(
                    "no authentication material provided; configure a password or an API token"
                        .to_string(),
                ));
            }
            (Some(password), None) => {
                validate_password(password)?;
                CredentialSecret::Password(ProxmoxPassword::new_unchecked(password.to_string()))
            }
            (None, Some((name, value))) => {
                CredentialSecret::Token(ProxmoxApiToken::parse(name, value)?)
            }
        };

        let username = ProxmoxUsername::parse(username)?;
        Ok(Credential::new(username, secret))
    }
}
