use crate::core::domain::error::ValidationError;
use crate::core::domain::value_object::proxmox_realm::{
    DEFAULT_REALM, ProxmoxRealm, validate_realm,
};

/// A realm-qualified Proxmox user id (`user@realm`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxmoxUsername {
    user: String,
    realm: ProxmoxRealm,
}

impl ProxmoxUsername {
    /// Creates a new username without validation.
    pub(crate) fn new_unchecked(user: String, realm: ProxmoxRealm) -> Self {
        Self { user, realm }
    }

    /// Splits a raw username into user and realm, appending the default realm
    /// when the raw value carries none.
    ///
    /// The split happens at the last `@`, so `svc@corp@ldap` keeps `svc@corp`
    /// as the user part.
    pub(crate) fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let (user, realm) = match raw.rsplit_once('@') {
            Some((user, realm)) => (user, realm),
            None => (raw, DEFAULT_REALM),
        };
        validate_username(user)?;
        validate_realm(realm)?;
        Ok(Self::new_unchecked(
            user.to_string(),
            ProxmoxRealm::new_unchecked(realm.to_string()),
        ))
    }

    /// Returns the user part without the realm.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the realm.
    #[must_use]
    pub fn realm(&self) -> &ProxmoxRealm {
        &self.realm
    }

    /// Returns the wire form `user@realm`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}@{}", self.user, self.realm.as_str())
    }
}

impl std::fmt::Display for ProxmoxUsername {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.realm.as_str())
    }
}

/// Validates the user part of a user id.
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.len() > 64 {
        return Err(ValidationError::Format(format!(
            "Username length must be at most 64 characters (got {})",
            username.len()
        )));
    }
    let forbidden = |c: char| c.is_whitespace() || c == ':' || c == '!' || c == '/';
    if username.chars().any(forbidden) {
        return Err(ValidationError::Format(
            "Username contains invalid characters (whitespace, ':', '!' or '/')".to_string(),
        ));
    }
    Ok(())
}
